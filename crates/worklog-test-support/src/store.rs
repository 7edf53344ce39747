//! Test event stores: in-memory and failing `EventStore` implementations.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use worklog_core::error::DomainError;
use worklog_core::event::{EventRecord, sort_by_timestamp};
use worklog_core::store::{AppendReceipt, EventStore};

/// An event store kept in memory. Enforces the same version continuity as
/// the file store so command handler tests see realistic conflicts.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: Mutex<BTreeMap<String, Vec<EventRecord>>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`, appended in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_records(records: Vec<EventRecord>) -> Self {
        let store = Self::new();
        {
            let mut streams = store.streams.lock().unwrap();
            for record in records {
                streams.entry(record.stream_id.clone()).or_default().push(record);
            }
        }
        store
    }

    /// Returns the number of records across all streams.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn len(&self) -> usize {
        self.streams.lock().unwrap().values().map(Vec::len).sum()
    }

    /// Returns true if no records have been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, record: &EventRecord) -> Result<AppendReceipt, DomainError> {
        let mut streams = self.streams.lock().unwrap();
        let stream = streams.entry(record.stream_id.clone()).or_default();
        let stored_version = stream.last().map_or(0, |e| e.version);
        if record.version != stored_version + 1 {
            return Err(DomainError::ConcurrencyConflict {
                stream_id: record.stream_id.clone(),
                expected: record.version - 1,
                actual: stored_version,
            });
        }
        stream.push(record.clone());
        Ok(AppendReceipt {
            next_seq: stream.len() as u64,
        })
    }

    async fn read_stream(&self, stream_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        Ok(self
            .streams
            .lock()
            .unwrap()
            .get(stream_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_all_events(&self) -> Result<Vec<EventRecord>, DomainError> {
        let mut all: Vec<EventRecord> = self
            .streams
            .lock()
            .unwrap()
            .values()
            .flatten()
            .cloned()
            .collect();
        sort_by_timestamp(&mut all);
        Ok(all)
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(&self, _record: &EventRecord) -> Result<AppendReceipt, DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }

    async fn read_stream(&self, _stream_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }

    async fn get_all_events(&self) -> Result<Vec<EventRecord>, DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }
}
