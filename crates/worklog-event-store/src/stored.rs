//! Storage-side record shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use worklog_core::event::{EventRecord, LoggedBy};

/// An [`EventRecord`] plus the storage position it was written at.
///
/// This is the on-disk shape only. `seq` is assigned by the store from the
/// stream's file ordering and is dropped by [`StoredEventRecord::into_record`]
/// before anything is handed to domain code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEventRecord {
    /// Event type name.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Owning stream.
    pub stream_id: String,
    /// Aggregate-assigned version.
    pub version: i64,
    /// Command time.
    pub timestamp: DateTime<Utc>,
    /// Command origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_by: Option<LoggedBy>,
    /// Event-specific data.
    pub payload: serde_json::Value,
    /// Storage-assigned position within the stream.
    pub seq: u64,
}

impl StoredEventRecord {
    /// Wraps a domain record with its storage position.
    #[must_use]
    pub fn new(record: EventRecord, seq: u64) -> Self {
        Self {
            event_type: record.event_type,
            stream_id: record.stream_id,
            version: record.version,
            timestamp: record.timestamp,
            logged_by: record.logged_by,
            payload: record.payload,
            seq,
        }
    }

    /// Drops storage-only fields.
    #[must_use]
    pub fn into_record(self) -> EventRecord {
        EventRecord {
            event_type: self.event_type,
            stream_id: self.stream_id,
            version: self.version,
            timestamp: self.timestamp,
            logged_by: self.logged_by,
            payload: self.payload,
        }
    }
}
