//! The `tasks` read model.
//!
//! `goal_title` is copied from the `goals` projection at the moment the
//! task is projected. Replay must therefore project a goal's `GoalAdded`
//! before any of its tasks, which the sequential rebuild bus guarantees.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use worklog_bus::EventBus;
use worklog_core::event::EventRecord;
use worklog_core::handler::{HandlerError, ProjectionHandler};
use worklog_projection_store::ProjectionModule;

use crate::domain::events::{TASK_ADDED, TASK_COMPLETED, TaskAdded};

/// Keeps one `tasks` row per task stream.
#[derive(Debug, Clone)]
pub struct TasksProjection {
    pool: SqlitePool,
}

impl TasksProjection {
    /// Creates a projection writing through `pool`.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn goal_title(&self, goal_id: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT title FROM goals WHERE id = ?")
            .bind(goal_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(title,)| title))
    }
}

#[async_trait]
impl ProjectionHandler for TasksProjection {
    fn name(&self) -> &str {
        "tasks"
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), HandlerError> {
        match event.event_type.as_str() {
            TASK_ADDED => {
                let body: TaskAdded = event.decode_payload()?;
                let goal_title = self.goal_title(&body.goal_id).await?;
                if goal_title.is_none() {
                    tracing::warn!(
                        task_id = %event.stream_id,
                        goal_id = %body.goal_id,
                        "goal not yet projected; goal_title left empty"
                    );
                }
                sqlx::query(
                    "INSERT OR REPLACE INTO tasks
                        (id, goal_id, goal_title, title, done, version, updated_at)
                     VALUES (?, ?, ?, ?, 0, ?, ?)",
                )
                .bind(&event.stream_id)
                .bind(&body.goal_id)
                .bind(goal_title)
                .bind(&body.title)
                .bind(event.version)
                .bind(event.timestamp.to_rfc3339())
                .execute(&self.pool)
                .await?;
            }
            TASK_COMPLETED => {
                let result = sqlx::query(
                    "UPDATE tasks SET done = 1, version = ?, updated_at = ? WHERE id = ?",
                )
                .bind(event.version)
                .bind(event.timestamp.to_rfc3339())
                .bind(&event.stream_id)
                .execute(&self.pool)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(format!("no tasks row for {}", event.stream_id).into());
                }
            }
            other => return Err(format!("tasks projection cannot handle {other}").into()),
        }
        Ok(())
    }
}

/// Registers [`TasksProjection`] for every task event type.
#[derive(Debug, Default, Clone, Copy)]
pub struct TasksModule;

impl ProjectionModule for TasksModule {
    fn name(&self) -> &str {
        "tasks"
    }

    fn register(&self, pool: &SqlitePool, bus: &mut EventBus) {
        let projection = Arc::new(TasksProjection::new(pool.clone()));
        bus.subscribe(TASK_ADDED, projection.clone());
        bus.subscribe(TASK_COMPLETED, projection);
    }
}
