//! Activity log projection.
//!
//! Subscribes to every event type and records one row per event, giving a
//! flat, chronological view of everything that happened across streams.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use worklog_bus::EventBus;
use worklog_core::event::{EventRecord, LoggedBy};
use worklog_core::handler::{HandlerError, ProjectionHandler, WILDCARD};

use crate::module::ProjectionModule;

/// Writes every event into the `activity` table.
#[derive(Debug, Clone)]
pub struct ActivityProjection {
    pool: SqlitePool,
}

impl ActivityProjection {
    /// Creates a projection writing through `pool`.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectionHandler for ActivityProjection {
    fn name(&self) -> &str {
        "activity"
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), HandlerError> {
        sqlx::query(
            "INSERT OR REPLACE INTO activity (stream_id, version, event_type, logged_by, occurred_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&event.stream_id)
        .bind(event.version)
        .bind(&event.event_type)
        .bind(event.logged_by.map(LoggedBy::as_str))
        .bind(event.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Registers [`ActivityProjection`] on the wildcard topic.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActivityModule;

impl ProjectionModule for ActivityModule {
    fn name(&self) -> &str {
        "activity"
    }

    fn register(&self, pool: &SqlitePool, bus: &mut EventBus) {
        bus.subscribe(WILDCARD, Arc::new(ActivityProjection::new(pool.clone())));
    }
}

/// One row of the `activity` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ActivityRow {
    /// Stream the event belongs to.
    pub stream_id: String,
    /// Event version within its stream.
    pub version: i64,
    /// Event type.
    pub event_type: String,
    /// `human`, `machine`, or absent.
    pub logged_by: Option<String>,
    /// RFC 3339 event timestamp.
    pub occurred_at: String,
}

/// Lists activity rows, most recent first, capped at `limit`.
///
/// # Errors
///
/// Returns the driver error if the query fails.
pub async fn recent_activity(pool: &SqlitePool, limit: i64) -> Result<Vec<ActivityRow>, sqlx::Error> {
    sqlx::query_as::<_, ActivityRow>(
        "SELECT stream_id, version, event_type, logged_by, occurred_at
         FROM activity
         ORDER BY occurred_at DESC, stream_id, version DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
