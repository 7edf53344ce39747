//! Test projection handlers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use worklog_core::event::EventRecord;
use worklog_core::handler::{HandlerError, ProjectionHandler};

/// Shared, ordered log of handler invocations.
///
/// Each entry is `"{handler}:{type}:{stream}:{version}"`.
#[derive(Debug, Clone, Default)]
pub struct HandlerLog(Arc<Mutex<Vec<String>>>);

impl HandlerLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, handler: &str, event: &EventRecord) {
        self.0.lock().unwrap().push(format!(
            "{handler}:{}:{}:{}",
            event.event_type, event.stream_id, event.version
        ));
    }

    /// Returns a snapshot of all entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A handler that appends every event it sees to a [`HandlerLog`],
/// optionally after sleeping.
#[derive(Debug)]
pub struct RecordingHandler {
    name: String,
    log: HandlerLog,
    delay: Option<Duration>,
}

impl RecordingHandler {
    /// Creates a handler that records immediately.
    #[must_use]
    pub fn new(name: &str, log: HandlerLog) -> Self {
        Self {
            name: name.to_owned(),
            log,
            delay: None,
        }
    }

    /// Creates a handler that sleeps for `delay` before recording.
    #[must_use]
    pub fn delayed(name: &str, log: HandlerLog, delay: Duration) -> Self {
        Self {
            name: name.to_owned(),
            log,
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl ProjectionHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), HandlerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.log.push(&self.name, event);
        Ok(())
    }
}

/// A handler that always returns an error.
#[derive(Debug)]
pub struct FailingHandler(pub &'static str);

#[async_trait]
impl ProjectionHandler for FailingHandler {
    fn name(&self) -> &str {
        self.0
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), HandlerError> {
        Err(format!("{} cannot project {}", self.0, event.event_type).into())
    }
}

/// A handler that panics.
#[derive(Debug)]
pub struct PanickingHandler(pub &'static str);

#[async_trait]
impl ProjectionHandler for PanickingHandler {
    fn name(&self) -> &str {
        self.0
    }

    async fn handle(&self, _event: &EventRecord) -> Result<(), HandlerError> {
        panic!("{} blew up", self.0);
    }
}
