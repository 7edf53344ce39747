//! Shared test doubles and utilities for worklog.

mod clock;
mod handler;
mod store;

pub use clock::{FixedClock, SteppingClock};
pub use handler::{FailingHandler, HandlerLog, PanickingHandler, RecordingHandler};
pub use store::{FailingEventStore, InMemoryEventStore};

use chrono::{DateTime, Duration, TimeZone, Utc};
use worklog_core::event::EventRecord;

/// Fixed timestamp used across tests.
///
/// # Panics
///
/// Never; the date is a valid constant.
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// Builds a record with an empty object payload, stamped `offset_secs`
/// after [`base_time`].
#[must_use]
pub fn make_record(stream_id: &str, version: i64, event_type: &str, offset_secs: i64) -> EventRecord {
    EventRecord {
        event_type: event_type.to_owned(),
        stream_id: stream_id.to_owned(),
        version,
        timestamp: base_time() + Duration::seconds(offset_secs),
        logged_by: None,
        payload: serde_json::json!({}),
    }
}
