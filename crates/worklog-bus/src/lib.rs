//! Worklog: event bus.
//!
//! Delivers appended event records to projection handlers. The live command
//! path dispatches to all matching handlers concurrently; rebuild dispatches
//! one handler at a time so projections that read other projections see a
//! consistent order.

pub mod commit;
pub mod event_bus;

pub use commit::persist_and_publish;
pub use event_bus::{DispatchPolicy, DispatchReport, EventBus};
