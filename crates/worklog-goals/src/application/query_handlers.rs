//! Query handlers for goals.
//!
//! Queries read the `goals` projection, never the event log.

use serde::Serialize;
use sqlx::SqlitePool;
use worklog_core::error::DomainError;

use crate::domain::aggregates::GoalStatus;

/// Read-only view of one goal row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GoalView {
    /// Goal stream id.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// `low`, `medium` or `high`.
    pub priority: String,
    /// Lifecycle status name.
    pub status: String,
    /// Reason for the current block, if blocked.
    pub blocked_reason: Option<String>,
    /// Version of the last event applied to the row.
    pub version: i64,
    /// Timestamp of the `GoalAdded` event.
    pub created_at: String,
    /// Timestamp of the latest event.
    pub updated_at: String,
}

const LIST_GOALS: &str = "SELECT id, title, description, priority, status, blocked_reason,
        version, created_at, updated_at
 FROM goals
 ORDER BY created_at, id";

const LIST_GOALS_BY_STATUS: &str = "SELECT id, title, description, priority, status, blocked_reason,
        version, created_at, updated_at
 FROM goals
 WHERE status = ?
 ORDER BY created_at, id";

const GET_GOAL: &str = "SELECT id, title, description, priority, status, blocked_reason,
        version, created_at, updated_at
 FROM goals
 WHERE id = ?";

fn query_failed(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("goals query failed: {e}"))
}

/// Lists goals oldest first, optionally filtered by status.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the query fails.
pub async fn list_goals(
    pool: &SqlitePool,
    status: Option<GoalStatus>,
) -> Result<Vec<GoalView>, DomainError> {
    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, GoalView>(LIST_GOALS_BY_STATUS)
                .bind(status.as_str())
                .fetch_all(pool)
                .await
        }
        None => {
            sqlx::query_as::<_, GoalView>(LIST_GOALS)
                .fetch_all(pool)
                .await
        }
    };
    rows.map_err(query_failed)
}

/// Retrieves one goal by id.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the projection has no row
/// for `goal_id`, or `DomainError::Infrastructure` if the query fails.
pub async fn get_goal(pool: &SqlitePool, goal_id: &str) -> Result<GoalView, DomainError> {
    sqlx::query_as::<_, GoalView>(GET_GOAL)
        .bind(goal_id)
        .fetch_optional(pool)
        .await
        .map_err(query_failed)?
        .ok_or_else(|| DomainError::AggregateNotFound(goal_id.to_owned()))
}
