//! Projection module abstraction.

use sqlx::SqlitePool;
use worklog_bus::EventBus;

/// A set of projection handlers that share one piece of schema.
///
/// The CLI registers every module on a parallel bus for live commands; the
/// rebuilder registers the same modules on a sequential bus against a
/// freshly migrated database.
pub trait ProjectionModule: Send + Sync {
    /// Module name used in logs.
    fn name(&self) -> &str;

    /// Subscribes this module's handlers to `bus`, writing through `pool`.
    fn register(&self, pool: &SqlitePool, bus: &mut EventBus);
}
