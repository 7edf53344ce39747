//! Clock abstraction.
//!
//! Command methods stamp records with `clock.now()`. Tests inject a fixed or
//! stepping clock so timestamps, and therefore replay order, are
//! reproducible.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
