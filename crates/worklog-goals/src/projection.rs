//! The `goals` read model.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteQueryResult;
use worklog_bus::EventBus;
use worklog_core::event::EventRecord;
use worklog_core::handler::{HandlerError, ProjectionHandler};
use worklog_projection_store::ProjectionModule;

use crate::domain::aggregates::GoalStatus;
use crate::domain::events::{
    GOAL_ADDED, GOAL_BLOCKED, GOAL_COMPLETED, GOAL_EVENT_TYPES, GOAL_STARTED, GOAL_UNBLOCKED,
    GoalAdded, GoalBlocked,
};

/// Keeps one `goals` row per goal stream.
///
/// Every column comes from the event, so replaying the log reproduces the
/// table exactly.
#[derive(Debug, Clone)]
pub struct GoalsProjection {
    pool: SqlitePool,
}

impl GoalsProjection {
    /// Creates a projection writing through `pool`.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        event: &EventRecord,
        status: GoalStatus,
        blocked_reason: Option<&str>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            "UPDATE goals SET status = ?, blocked_reason = ?, version = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(blocked_reason)
        .bind(event.version)
        .bind(event.timestamp.to_rfc3339())
        .bind(&event.stream_id)
        .execute(&self.pool)
        .await
    }
}

#[async_trait]
impl ProjectionHandler for GoalsProjection {
    fn name(&self) -> &str {
        "goals"
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), HandlerError> {
        let result = match event.event_type.as_str() {
            GOAL_ADDED => {
                let body: GoalAdded = event.decode_payload()?;
                let at = event.timestamp.to_rfc3339();
                sqlx::query(
                    "INSERT OR REPLACE INTO goals
                        (id, title, description, priority, status, blocked_reason,
                         version, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, NULL, ?, ?, ?)",
                )
                .bind(&event.stream_id)
                .bind(&body.title)
                .bind(&body.description)
                .bind(&body.priority)
                .bind(GoalStatus::Pending.as_str())
                .bind(event.version)
                .bind(&at)
                .bind(&at)
                .execute(&self.pool)
                .await?
            }
            GOAL_STARTED => self.transition(event, GoalStatus::InProgress, None).await?,
            GOAL_BLOCKED => {
                let body: GoalBlocked = event.decode_payload()?;
                self.transition(event, GoalStatus::Blocked, Some(&body.reason))
                    .await?
            }
            GOAL_UNBLOCKED => self.transition(event, GoalStatus::Pending, None).await?,
            GOAL_COMPLETED => self.transition(event, GoalStatus::Completed, None).await?,
            other => return Err(format!("goals projection cannot handle {other}").into()),
        };

        if result.rows_affected() == 0 {
            return Err(format!(
                "no goals row for {} while applying {} v{}",
                event.stream_id, event.event_type, event.version
            )
            .into());
        }
        Ok(())
    }
}

/// Registers [`GoalsProjection`] for every goal event type.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoalsModule;

impl ProjectionModule for GoalsModule {
    fn name(&self) -> &str {
        "goals"
    }

    fn register(&self, pool: &SqlitePool, bus: &mut EventBus) {
        let projection = Arc::new(GoalsProjection::new(pool.clone()));
        for event_type in GOAL_EVENT_TYPES {
            bus.subscribe(event_type, projection.clone());
        }
    }
}
