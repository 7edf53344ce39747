//! Shared application state.

use std::sync::Arc;

use tracing::{info, warn};
use worklog_bus::EventBus;
use worklog_core::clock::Clock;
use worklog_event_store::fs_event_store::FsEventStore;
use worklog_goals::GoalsModule;
use worklog_projection_store::activity::ActivityModule;
use worklog_projection_store::migrator::MigrationFile;
use worklog_projection_store::{Migrator, ProjectionDb, ProjectionModule};
use worklog_tasks::TasksModule;

use crate::config::Config;
use crate::error::AppError;

/// Every projection module, in registration order.
#[must_use]
pub fn modules() -> Vec<Arc<dyn ProjectionModule>> {
    vec![
        Arc::new(GoalsModule),
        Arc::new(TasksModule),
        Arc::new(ActivityModule),
    ]
}

/// Opens the projection database, refuses to continue if an applied
/// migration changed on disk, then applies what is pending.
///
/// # Errors
///
/// Returns `AppError::Database` or `AppError::Migration`.
pub async fn open_migrated(
    config: &Config,
    migrator: &Migrator,
) -> Result<(ProjectionDb, Vec<MigrationFile>), AppError> {
    let db = ProjectionDb::open(config.db_path()).await?;
    let prepared = async {
        let report = migrator.verify(db.pool()).await?;
        for (namespace, version) in &report.missing {
            warn!(namespace, version, "applied migration no longer on disk");
        }
        migrator.run(db.pool()).await
    }
    .await;
    match prepared {
        Ok(applied) => Ok((db, applied)),
        Err(e) => {
            if let Err(close) = db.dispose().await {
                warn!(error = %close, "failed to close database after migration error");
            }
            Err(e.into())
        }
    }
}

/// State every goal, task and activity command runs against.
pub struct AppState {
    /// The append-only event log.
    pub store: Arc<FsEventStore>,
    /// The migrated projection database.
    pub db: ProjectionDb,
    /// Live bus with every projection module subscribed.
    pub bus: EventBus,
    /// Time source for new records.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Runs the startup sequence: open, verify, migrate, subscribe.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` or `AppError::Migration`.
    pub async fn open(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let migrator = Migrator::new(config.migrations_dir.clone(), Arc::clone(&clock));
        let (db, applied) = open_migrated(config, &migrator).await?;
        if !applied.is_empty() {
            info!(count = applied.len(), "applied pending migrations");
        }

        let mut bus = EventBus::parallel();
        for module in modules() {
            module.register(db.pool(), &mut bus);
        }

        Ok(Self {
            store: Arc::new(FsEventStore::new(config.events_dir())),
            db,
            bus,
            clock,
        })
    }

    /// Flushes and closes the projection database.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the checkpoint fails.
    pub async fn close(self) -> Result<(), AppError> {
        self.db.dispose().await?;
        Ok(())
    }
}
