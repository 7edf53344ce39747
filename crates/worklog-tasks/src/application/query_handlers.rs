//! Query handlers for tasks.

use serde::Serialize;
use sqlx::SqlitePool;
use worklog_core::error::DomainError;

/// Read-only view of one task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    /// Task stream id.
    pub id: String,
    /// Owning goal stream id.
    pub goal_id: String,
    /// Title of the owning goal when the task was added.
    pub goal_title: Option<String>,
    /// Short title.
    pub title: String,
    /// Whether the task is completed.
    pub done: bool,
    /// Version of the last event applied to the row.
    pub version: i64,
    /// Timestamp of the latest event.
    pub updated_at: String,
}

const LIST_TASKS: &str = "SELECT id, goal_id, goal_title, title, done, version, updated_at
 FROM tasks
 ORDER BY goal_id, updated_at, id";

const LIST_TASKS_FOR_GOAL: &str = "SELECT id, goal_id, goal_title, title, done, version, updated_at
 FROM tasks
 WHERE goal_id = ?
 ORDER BY updated_at, id";

/// Lists tasks, optionally only those filed under `goal_id`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the query fails.
pub async fn list_tasks(
    pool: &SqlitePool,
    goal_id: Option<&str>,
) -> Result<Vec<TaskView>, DomainError> {
    let rows = match goal_id {
        Some(goal_id) => {
            sqlx::query_as::<_, TaskView>(LIST_TASKS_FOR_GOAL)
                .bind(goal_id)
                .fetch_all(pool)
                .await
        }
        None => sqlx::query_as::<_, TaskView>(LIST_TASKS).fetch_all(pool).await,
    };
    rows.map_err(|e| DomainError::Infrastructure(format!("tasks query failed: {e}")))
}
