//! Rebuild state machine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use worklog_bus::EventBus;
use worklog_core::error::DomainError;
use worklog_core::store::EventStore;
use worklog_projection_store::{DbError, MigrationError, Migrator, ProjectionDb, ProjectionModule};

/// Stage of a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildPhase {
    /// Nothing has run yet.
    Idle,
    /// Closing the live database connection.
    Draining,
    /// Deleting and re-migrating the database file.
    Reinitializing,
    /// Publishing the event log through the sequential bus.
    Replaying,
    /// Finished successfully.
    Done,
    /// Stopped on an error.
    Failed,
}

impl fmt::Display for RebuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Draining => "draining",
            Self::Reinitializing => "reinitializing",
            Self::Replaying => "replaying",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Outcome of a successful rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Events published during replay.
    pub events_replayed: usize,
    /// Handler invocations that failed during replay.
    pub handler_failures: usize,
}

/// What went wrong inside a rebuild phase.
#[derive(Debug, Error)]
pub enum RebuildCause {
    /// Opening, closing or deleting the database failed.
    #[error(transparent)]
    Database(#[from] DbError),
    /// Migrating the fresh database failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),
    /// Reading the event log failed.
    #[error(transparent)]
    EventStore(#[from] DomainError),
}

/// A rebuild that stopped, and the phase it stopped in.
#[derive(Debug, Error)]
#[error("rebuild failed while {phase}: {source}")]
pub struct RebuildError {
    /// Phase that was running when the error occurred.
    pub phase: RebuildPhase,
    /// Underlying error.
    #[source]
    pub source: RebuildCause,
}

/// Reconstructs every projection from the event log.
///
/// A rebuild runs `Draining -> Reinitializing -> Replaying -> Done`, or
/// stops in `Failed`. It never retries; a failed rebuild is run again from
/// the start.
pub struct Rebuilder {
    store: Arc<dyn EventStore>,
    modules: Vec<Arc<dyn ProjectionModule>>,
    db_path: PathBuf,
    migrator: Migrator,
    phase: Mutex<RebuildPhase>,
}

impl fmt::Debug for Rebuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modules: Vec<&str> = self.modules.iter().map(|m| m.name()).collect();
        f.debug_struct("Rebuilder")
            .field("db_path", &self.db_path)
            .field("migrator", &self.migrator)
            .field("modules", &modules)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Rebuilder {
    /// Creates a rebuilder for the database at `db_path`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, db_path: impl Into<PathBuf>, migrator: Migrator) -> Self {
        Self {
            store,
            modules: Vec::new(),
            db_path: db_path.into(),
            migrator,
            phase: Mutex::new(RebuildPhase::Idle),
        }
    }

    /// Adds a projection module to replay into.
    #[must_use]
    pub fn with_module(mut self, module: Arc<dyn ProjectionModule>) -> Self {
        self.modules.push(module);
        self
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> RebuildPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, phase: RebuildPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
        info!(phase = %phase, "rebuild phase");
    }

    fn fail(&self, phase: RebuildPhase, cause: impl Into<RebuildCause>) -> RebuildError {
        let source = cause.into();
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = RebuildPhase::Failed;
        error!(phase = %phase, error = %source, "rebuild failed");
        RebuildError { phase, source }
    }

    /// Runs a full rebuild. `live` is the connection currently serving the
    /// database, if any; it is closed before the file is deleted.
    ///
    /// # Errors
    ///
    /// Returns `RebuildError` naming the phase that failed.
    pub async fn rebuild(&self, live: Option<ProjectionDb>) -> Result<RebuildReport, RebuildError> {
        self.enter(RebuildPhase::Draining);
        if let Some(db) = live {
            db.dispose()
                .await
                .map_err(|e| self.fail(RebuildPhase::Draining, e))?;
        }

        self.enter(RebuildPhase::Reinitializing);
        let db = self
            .reinitialize()
            .await
            .map_err(|e| self.fail(RebuildPhase::Reinitializing, e))?;

        self.enter(RebuildPhase::Replaying);
        let report = match self.replay(&db).await {
            Ok(report) => report,
            Err(e) => {
                if let Err(close) = db.dispose().await {
                    warn!(error = %close, "failed to close database after replay error");
                }
                return Err(self.fail(RebuildPhase::Replaying, e));
            }
        };

        self.enter(RebuildPhase::Done);
        db.dispose()
            .await
            .map_err(|e| self.fail(RebuildPhase::Done, e))?;
        info!(
            events_replayed = report.events_replayed,
            handler_failures = report.handler_failures,
            "rebuild complete"
        );
        Ok(report)
    }

    async fn reinitialize(&self) -> Result<ProjectionDb, RebuildCause> {
        ProjectionDb::destroy(&self.db_path).await?;
        let db = ProjectionDb::open(&self.db_path).await?;
        if let Err(e) = self.migrator.run(db.pool()).await {
            if let Err(close) = db.dispose().await {
                warn!(error = %close, "failed to close database after migration error");
            }
            return Err(e.into());
        }
        Ok(db)
    }

    async fn replay(&self, db: &ProjectionDb) -> Result<RebuildReport, RebuildCause> {
        let mut bus = EventBus::sequential();
        for module in &self.modules {
            module.register(db.pool(), &mut bus);
            debug!(module = module.name(), "registered projection module");
        }

        let events = self.store.get_all_events().await?;
        let mut report = RebuildReport::default();
        for event in &events {
            let dispatch = bus.publish(event).await;
            report.handler_failures += dispatch.failed.len();
            report.events_replayed += 1;
        }
        Ok(report)
    }
}
