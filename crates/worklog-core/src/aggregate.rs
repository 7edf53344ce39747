//! Aggregate abstraction.

use serde::Serialize;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::event::{EventRecord, LoggedBy};

/// An entity whose state is the fold of its event history.
///
/// Command methods on implementors follow one shape: check the current
/// state, validate inputs, then call [`Aggregate::record`] which stamps the
/// next version and runs the same [`Aggregate::apply`] used by
/// [`Aggregate::rehydrate`]. Commands never perform I/O.
pub trait Aggregate: Sized + Send + Sync {
    /// Creates an empty aggregate at version 0.
    fn create(stream_id: &str) -> Self;

    /// Returns the stream identifier.
    fn stream_id(&self) -> &str;

    /// Returns the version of the last applied record (0 when empty).
    fn version(&self) -> i64;

    /// Applies one record to in-memory state and sets the version to
    /// `event.version`.
    ///
    /// Implementations decode the payload before mutating any field so that
    /// a failure leaves the aggregate untouched.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` for unknown event types or
    /// malformed payloads.
    fn apply(&mut self, event: &EventRecord) -> Result<(), DomainError>;

    /// Rebuilds an aggregate by folding `history` over an empty instance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::VersionGap` if the history is not the contiguous
    /// sequence `1..=n`, `DomainError::Infrastructure` if a record belongs to
    /// another stream, or any error from [`Aggregate::apply`].
    fn rehydrate(stream_id: &str, history: &[EventRecord]) -> Result<Self, DomainError> {
        let mut aggregate = Self::create(stream_id);
        for event in history {
            if event.stream_id != stream_id {
                return Err(DomainError::Infrastructure(format!(
                    "record from stream {} found in history of {stream_id}",
                    event.stream_id
                )));
            }
            let expected = aggregate.version() + 1;
            if event.version != expected {
                return Err(DomainError::VersionGap {
                    stream_id: stream_id.to_owned(),
                    expected,
                    found: event.version,
                });
            }
            aggregate.apply(event)?;
        }
        Ok(aggregate)
    }

    /// Builds the next record for this stream, applies it, and returns it
    /// for persistence.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload cannot be
    /// serialized, or any error from [`Aggregate::apply`].
    fn record<P: Serialize>(
        &mut self,
        event_type: &str,
        payload: &P,
        logged_by: Option<LoggedBy>,
        clock: &dyn Clock,
    ) -> Result<EventRecord, DomainError> {
        let payload = serde_json::to_value(payload).map_err(|e| {
            DomainError::Infrastructure(format!("{event_type} payload serialization failed: {e}"))
        })?;
        let event = EventRecord {
            event_type: event_type.to_owned(),
            stream_id: self.stream_id().to_owned(),
            version: self.version() + 1,
            timestamp: clock.now(),
            logged_by,
            payload,
        };
        self.apply(&event)?;
        debug_assert_eq!(self.version(), event.version);
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::Deserialize;

    #[derive(Debug)]
    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Incremented {
        by: i64,
    }

    #[derive(Debug, PartialEq)]
    struct Counter {
        id: String,
        version: i64,
        total: i64,
    }

    impl Counter {
        fn increment(&mut self, by: i64, clock: &dyn Clock) -> Result<EventRecord, DomainError> {
            if by <= 0 {
                return Err(DomainError::Precondition("increment must be positive".into()));
            }
            self.record("Incremented", &Incremented { by }, None, clock)
        }
    }

    impl Aggregate for Counter {
        fn create(stream_id: &str) -> Self {
            Self {
                id: stream_id.to_owned(),
                version: 0,
                total: 0,
            }
        }

        fn stream_id(&self) -> &str {
            &self.id
        }

        fn version(&self) -> i64 {
            self.version
        }

        fn apply(&mut self, event: &EventRecord) -> Result<(), DomainError> {
            let body: Incremented = event.decode_payload()?;
            self.total += body.by;
            self.version = event.version;
            Ok(())
        }
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_record_stamps_next_version_and_applies_it() {
        // Arrange
        let clock = clock();
        let mut counter = Counter::create("counter-1");

        // Act
        let first = counter.increment(2, &clock).unwrap();
        let second = counter.increment(3, &clock).unwrap();

        // Assert
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(second.stream_id, "counter-1");
        assert_eq!(second.timestamp, clock.0);
        assert_eq!(counter.total, 5);
        assert_eq!(counter.version, 2);
    }

    #[test]
    fn test_rehydrate_matches_live_instance() {
        // Arrange
        let clock = clock();
        let mut live = Counter::create("counter-1");
        let history = vec![
            live.increment(1, &clock).unwrap(),
            live.increment(4, &clock).unwrap(),
            live.increment(2, &clock).unwrap(),
        ];

        // Act
        let rehydrated = Counter::rehydrate("counter-1", &history).unwrap();

        // Assert
        assert_eq!(rehydrated, live);
    }

    #[test]
    fn test_rehydrate_rejects_version_gap() {
        // Arrange
        let clock = clock();
        let mut live = Counter::create("counter-1");
        let first = live.increment(1, &clock).unwrap();
        let _second = live.increment(1, &clock).unwrap();
        let third = live.increment(1, &clock).unwrap();

        // Act
        let result = Counter::rehydrate("counter-1", &[first, third]);

        // Assert
        match result {
            Err(DomainError::VersionGap {
                stream_id,
                expected,
                found,
            }) => {
                assert_eq!(stream_id, "counter-1");
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("expected VersionGap, got {other:?}"),
        }
    }

    #[test]
    fn test_rehydrate_rejects_foreign_stream_records() {
        let clock = clock();
        let mut other = Counter::create("counter-2");
        let foreign = other.increment(1, &clock).unwrap();

        let result = Counter::rehydrate("counter-1", &[foreign]);

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[test]
    fn test_failed_guard_leaves_state_untouched() {
        let clock = clock();
        let mut counter = Counter::create("counter-1");
        counter.increment(1, &clock).unwrap();

        let result = counter.increment(0, &clock);

        assert!(matches!(result, Err(DomainError::Precondition(_))));
        assert_eq!(counter.version, 1);
        assert_eq!(counter.total, 1);
    }
}
