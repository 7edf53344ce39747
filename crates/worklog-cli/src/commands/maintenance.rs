//! Migration, verification, rebuild and activity commands.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, warn};
use worklog_core::clock::Clock;
use worklog_event_store::fs_event_store::FsEventStore;
use worklog_projection_store::activity::recent_activity;
use worklog_projection_store::{Migrator, ProjectionDb};
use worklog_rebuild::Rebuilder;

use crate::config::Config;
use crate::error::AppError;
use crate::state::{AppState, modules, open_migrated};

fn migrator(config: &Config, clock: Arc<dyn Clock>) -> Migrator {
    Migrator::new(config.migrations_dir.clone(), clock)
}

/// `worklog migrate`: applies pending migrations and lists them.
///
/// # Errors
///
/// Returns `AppError::Migration` on checksum drift or a failed migration.
pub async fn migrate(config: &Config, clock: Arc<dyn Clock>) -> Result<Value, AppError> {
    let (db, applied) = open_migrated(config, &migrator(config, clock)).await?;
    db.dispose().await?;

    let applied: Vec<String> = applied
        .iter()
        .map(|m| format!("{}/{:03}-{}", m.namespace, m.version, m.name))
        .collect();
    info!(count = applied.len(), "migrate finished");
    Ok(json!({ "applied": applied }))
}

/// `worklog verify`: compares applied migrations with the files on disk
/// without applying anything.
///
/// # Errors
///
/// Returns `AppError::Migration` with every drifted migration when any
/// applied file changed.
pub async fn verify(config: &Config, clock: Arc<dyn Clock>) -> Result<Value, AppError> {
    let migrator = migrator(config, clock);
    let db = ProjectionDb::open(config.db_path()).await?;
    let outcome = async {
        let report = migrator.verify(db.pool()).await?;
        let pending = migrator.pending(db.pool()).await?;
        Ok::<_, AppError>((report, pending))
    }
    .await;
    db.dispose().await?;
    let (report, pending) = outcome?;

    let missing: Vec<String> = report
        .missing
        .iter()
        .map(|(namespace, version)| format!("{namespace}/{version:03}"))
        .collect();
    let pending: Vec<String> = pending
        .iter()
        .map(|m| format!("{}/{:03}-{}", m.namespace, m.version, m.name))
        .collect();
    Ok(json!({
        "verified": report.verified,
        "missing": missing,
        "pending": pending,
    }))
}

/// `worklog rebuild --yes`: deletes the projection database and replays
/// the event log into a fresh one.
///
/// # Errors
///
/// Returns `AppError::Refused` without `--yes`, or `AppError::Rebuild`
/// naming the phase that failed.
pub async fn rebuild(config: &Config, clock: Arc<dyn Clock>, yes: bool) -> Result<Value, AppError> {
    if !yes {
        return Err(AppError::Refused(format!(
            "rebuild deletes {}; pass --yes to continue",
            config.db_path().display()
        )));
    }

    let store = Arc::new(FsEventStore::new(config.events_dir()));
    let rebuilder = modules().into_iter().fold(
        Rebuilder::new(store, config.db_path(), migrator(config, clock)),
        Rebuilder::with_module,
    );
    let report = rebuilder.rebuild(None).await?;
    if report.handler_failures > 0 {
        warn!(
            failures = report.handler_failures,
            "some events could not be projected during rebuild"
        );
    }
    Ok(json!({
        "eventsReplayed": report.events_replayed,
        "handlerFailures": report.handler_failures,
    }))
}

/// `worklog activity`: most recent events first.
///
/// # Errors
///
/// Returns `AppError::Query` if the query fails.
pub async fn activity(state: &AppState, limit: u32) -> Result<Value, AppError> {
    let rows = recent_activity(state.db.pool(), i64::from(limit)).await?;
    let rows: Vec<Value> = rows
        .into_iter()
        .map(|row| {
            json!({
                "streamId": row.stream_id,
                "version": row.version,
                "type": row.event_type,
                "loggedBy": row.logged_by,
                "occurredAt": row.occurred_at,
            })
        })
        .collect();
    Ok(Value::Array(rows))
}
