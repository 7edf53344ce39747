//! Worklog: projection rebuild.
//!
//! Throws away the projection database and reconstructs it by replaying the
//! whole event log through a sequential bus.

pub mod rebuilder;

pub use rebuilder::{RebuildCause, RebuildError, RebuildPhase, RebuildReport, Rebuilder};
