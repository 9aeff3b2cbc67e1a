//! Short ID prefix resolution for CLI commands.
//!
//! Any unique prefix of a UUID is accepted in place of the full ID, the way
//! git accepts short hashes. List views print the first 8 characters.

use anyhow::{bail, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

const TASK_QUERY: &str = "SELECT id FROM tasks WHERE id LIKE ? ORDER BY id";
const NOTIFICATION_QUERY: &str = "SELECT id FROM notifications WHERE id LIKE ? AND user_id = ? ORDER BY id";

pub async fn resolve_task_id(pool: &SqlitePool, prefix: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(prefix) {
        return Ok(uuid);
    }
    validate_prefix(prefix)?;

    let rows: Vec<(String,)> = sqlx::query_as(TASK_QUERY)
        .bind(like_pattern(prefix))
        .fetch_all(pool)
        .await?;
    pick_one(rows, prefix, "task")
}

/// Only the user's own notifications are candidates.
pub async fn resolve_notification_id(pool: &SqlitePool, prefix: &str, user_id: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(prefix) {
        return Ok(uuid);
    }
    validate_prefix(prefix)?;

    let rows: Vec<(String,)> = sqlx::query_as(NOTIFICATION_QUERY)
        .bind(like_pattern(prefix))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    pick_one(rows, prefix, "notification")
}

fn like_pattern(prefix: &str) -> String {
    format!("{}%", prefix.to_lowercase())
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        bail!("ID prefix must not be empty");
    }
    if !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        bail!("Invalid ID prefix '{prefix}': must contain only hex characters and dashes");
    }
    Ok(())
}

fn pick_one(rows: Vec<(String,)>, prefix: &str, entity: &str) -> Result<Uuid> {
    match rows.as_slice() {
        [] => bail!("No {entity} found matching '{prefix}'"),
        [(id,)] => Ok(Uuid::parse_str(id)?),
        _ => {
            let mut msg = format!("Ambiguous prefix '{prefix}': matches {} {entity}s:", rows.len());
            for (id,) in &rows {
                msg.push_str("\n  ");
                msg.push_str(id);
            }
            bail!("{msg}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteTaskRepository};
    use crate::domain::models::{NewTask, Task};
    use crate::domain::ports::TaskRepository;

    #[test]
    fn test_validate_prefix() {
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("xyz").is_err());
        assert!(validate_prefix("ab12-").is_ok());
    }

    #[tokio::test]
    async fn test_resolve_task_prefix() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteTaskRepository::new(pool.clone());
        let task = Task::create(NewTask::new("Menu", "Tri-fold", "Bistro"), "s1").unwrap();
        repo.create(&task).await.unwrap();

        let full = task.id.to_string();
        assert_eq!(resolve_task_id(&pool, &full).await.unwrap(), task.id);
        assert_eq!(resolve_task_id(&pool, &full[..8].to_uppercase()).await.unwrap(), task.id);

        let missing = if full.starts_with('0') { "f" } else { "0" };
        assert!(resolve_task_id(&pool, missing).await.is_err());
    }
}
