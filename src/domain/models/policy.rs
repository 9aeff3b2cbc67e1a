//! Department transition policy.
//!
//! The policy is a static table: each rule says which department may move a
//! task out of which statuses and into which targets. A (status, department)
//! pair with no rule allows nothing.

use super::department::Department;
use super::task::TaskStatus;

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    /// Department the rule applies to
    pub department: Department,
    /// Statuses the department may move a task out of
    pub from: &'static [TaskStatus],
    /// Targets reachable from any status in `from`, in display order
    pub to: &'static [TaskStatus],
}

/// The whole workflow. At most one rule per department, and no rule leaves
/// `completed`.
pub const TRANSITION_POLICY: &[TransitionRule] = &[
    TransitionRule {
        department: Department::Sales,
        from: &[TaskStatus::New, TaskStatus::InSales],
        to: &[TaskStatus::InDesign],
    },
    TransitionRule {
        department: Department::Design,
        from: &[TaskStatus::InDesign],
        to: &[TaskStatus::InManagement, TaskStatus::InSales],
    },
    TransitionRule {
        department: Department::Management,
        from: &[TaskStatus::InManagement],
        to: &[
            TaskStatus::InProduction,
            TaskStatus::InDesign,
            TaskStatus::InSales,
        ],
    },
    TransitionRule {
        department: Department::Production,
        from: &[TaskStatus::InProduction],
        to: &[TaskStatus::Completed],
    },
];

/// Statuses `department` may move a task to from `current`.
pub fn allowed_next_statuses(current: TaskStatus, department: Department) -> &'static [TaskStatus] {
    TRANSITION_POLICY
        .iter()
        .find(|rule| rule.department == department && rule.from.contains(&current))
        .map_or(&[], |rule| rule.to)
}

/// Whether `department` may move a task from `current` to `target`.
pub fn is_transition_allowed(current: TaskStatus, department: Department, target: TaskStatus) -> bool {
    allowed_next_statuses(current, department).contains(&target)
}

/// Statuses a department is expected to act on; drives the department queue.
pub fn statuses_owned_by(department: Department) -> &'static [TaskStatus] {
    TRANSITION_POLICY
        .iter()
        .find(|rule| rule.department == department)
        .map_or(&[], |rule| rule.from)
}
