//! Persist-then-publish helper used by every command handler.

use tracing::warn;

use worklog_core::error::DomainError;
use worklog_core::event::EventRecord;
use worklog_core::store::EventStore;

use crate::event_bus::EventBus;

/// Appends `record` to `store`, then publishes it on `bus`.
///
/// Nothing is published unless the append succeeds. Handler failures are
/// reported by the bus and do not fail the command.
///
/// # Errors
///
/// Returns any error from [`EventStore::append`].
pub async fn persist_and_publish(
    store: &dyn EventStore,
    bus: &EventBus,
    record: EventRecord,
) -> Result<EventRecord, DomainError> {
    store.append(&record).await?;
    let report = bus.publish(&record).await;
    if !report.is_clean() {
        warn!(
            stream_id = %record.stream_id,
            version = record.version,
            failed = ?report.failed,
            "event persisted but some projections failed"
        );
    }
    Ok(record)
}
