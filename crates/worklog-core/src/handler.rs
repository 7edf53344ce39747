//! Projection handler abstraction.

use async_trait::async_trait;

use crate::event::EventRecord;

/// Subscription key that matches every event type.
pub const WILDCARD: &str = "*";

/// Error type returned by projection handlers. Handlers usually fail on
/// database or payload errors; the bus only needs to log them.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Builds or updates one read model from events.
///
/// Handlers may see the same event more than once (live traffic and then a
/// rebuild), so writes must be insert-or-replace keyed by the event's
/// stream and fields rather than blind appends.
#[async_trait]
pub trait ProjectionHandler: Send + Sync {
    /// Handler name used in logs.
    fn name(&self) -> &str;

    /// Applies one event to the read model.
    async fn handle(&self, event: &EventRecord) -> Result<(), HandlerError>;
}
