//! Event store abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::EventRecord;

/// Receipt returned by a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Storage position assigned to the appended record within its stream.
    pub next_seq: u64,
}

/// Append-only storage of per-stream event records.
///
/// Implementations serialize appends to the same stream. Records handed
/// back to callers never carry storage-assigned fields.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Durably appends one record to its stream.
    async fn append(&self, record: &EventRecord) -> Result<AppendReceipt, DomainError>;

    /// Loads one stream in storage order. A stream that was never written
    /// yields an empty vector.
    async fn read_stream(&self, stream_id: &str) -> Result<Vec<EventRecord>, DomainError>;

    /// Loads every stream, sorted by timestamp with a stable sort.
    async fn get_all_events(&self) -> Result<Vec<EventRecord>, DomainError>;
}
