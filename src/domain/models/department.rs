//! Departments and the acting identity.

use serde::{Deserialize, Serialize};

use super::task::UserId;
use crate::domain::errors::{DomainError, DomainResult};

/// Organizational unit a user belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    /// Takes orders and creates tasks
    Sales,
    Design,
    /// Approves designs for production
    Management,
    Production,
}

impl Department {
    /// Every department, in workflow order.
    pub const ALL: [Department; 4] = [
        Self::Sales,
        Self::Design,
        Self::Management,
        Self::Production,
    ];

    /// Lowercase name used in storage, config and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Design => "design",
            Self::Management => "management",
            Self::Production => "production",
        }
    }

    /// Parse a department name, ignoring case and surrounding space.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sales" => Some(Self::Sales),
            "design" => Some(Self::Design),
            "management" => Some(Self::Management),
            "production" => Some(Self::Production),
            _ => None,
        }
    }

    /// Capitalized name for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::Design => "Design",
            Self::Management => "Management",
            Self::Production => "Production",
        }
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller of an operation: who they are and which department they act for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque id from the identity provider
    pub user_id: UserId,
    pub department: Department,
}

impl Actor {
    /// Build an actor; the user id is checked by [`Actor::validate`].
    pub fn new(user_id: impl Into<UserId>, department: Department) -> Self {
        Self {
            user_id: user_id.into(),
            department,
        }
    }

    /// Reject anonymous callers.
    pub fn validate(&self) -> DomainResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(DomainError::validation("Actor user id cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_names() {
        for dept in Department::ALL {
            assert_eq!(Department::from_str(dept.as_str()), Some(dept));
        }
        assert_eq!(Department::from_str(" Design "), Some(Department::Design));
        assert_eq!(Department::from_str("accounting"), None);
    }

    #[test]
    fn test_actor_validation() {
        assert!(Actor::new("u1", Department::Sales).validate().is_ok());
        assert!(Actor::new("  ", Department::Sales).validate().is_err());
    }
}
