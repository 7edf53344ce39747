//! Event record model.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Who caused an event to be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggedBy {
    /// A person issued the command.
    Human,
    /// An automated agent issued the command.
    Machine,
}

impl LoggedBy {
    /// Returns the wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Machine => "machine",
        }
    }
}

impl std::fmt::Display for LoggedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoggedBy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            "machine" => Ok(Self::Machine),
            other => Err(DomainError::Precondition(format!(
                "logged-by must be 'human' or 'machine', got '{other}'"
            ))),
        }
    }
}

/// An immutable business fact belonging to one stream.
///
/// `version` is assigned by the aggregate that produced the record and
/// increases by exactly one per record within a stream, starting at 1.
/// Storage never rewrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event type name, used for handler routing.
    #[serde(rename = "type")]
    pub event_type: String,
    /// The stream (entity) this record belongs to.
    pub stream_id: String,
    /// Position of this record in its stream's business history.
    pub version: i64,
    /// When the command that produced this record ran.
    pub timestamp: DateTime<Utc>,
    /// Origin of the command, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_by: Option<LoggedBy>,
    /// Event-specific data.
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Decodes the payload into a typed event body.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload does not match `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!(
                "malformed {} payload in stream {} at version {}: {e}",
                self.event_type, self.stream_id, self.version
            ))
        })
    }
}

/// Sorts records by timestamp, oldest first.
///
/// The sort is stable: records with equal timestamps keep their incoming
/// relative order. Nothing else about ties is guaranteed.
pub fn sort_by_timestamp(events: &mut [EventRecord]) {
    events.sort_by_key(|e| e.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(stream_id: &str, version: i64, secs: i64) -> EventRecord {
        EventRecord {
            event_type: "GoalAdded".to_owned(),
            stream_id: stream_id.to_owned(),
            version,
            timestamp: Utc.timestamp_opt(1_768_471_200 + secs, 0).unwrap(),
            logged_by: None,
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn test_event_record_serializes_with_camel_case_field_names() {
        // Arrange
        let mut event = record("goal-1", 1, 0);
        event.logged_by = Some(LoggedBy::Machine);

        // Act
        let json = serde_json::to_value(&event).unwrap();

        // Assert
        assert_eq!(json["type"], "GoalAdded");
        assert_eq!(json["streamId"], "goal-1");
        assert_eq!(json["version"], 1);
        assert_eq!(json["loggedBy"], "machine");
        assert!(json["timestamp"].as_str().unwrap().starts_with("2026-01-15T10:00:00"));
    }

    #[test]
    fn test_logged_by_is_omitted_when_absent() {
        let json = serde_json::to_value(record("goal-1", 1, 0)).unwrap();

        assert!(json.get("loggedBy").is_none());
    }

    #[test]
    fn test_sort_by_timestamp_is_stable_for_equal_timestamps() {
        // Arrange
        let mut events = vec![
            record("b", 1, 5),
            record("a", 1, 1),
            record("c", 1, 5),
            record("a", 2, 3),
        ];

        // Act
        sort_by_timestamp(&mut events);

        // Assert
        let order: Vec<(&str, i64)> = events
            .iter()
            .map(|e| (e.stream_id.as_str(), e.version))
            .collect();
        assert_eq!(order, vec![("a", 1), ("a", 2), ("b", 1), ("c", 1)]);
    }

    #[test]
    fn test_decode_payload_reports_stream_and_version_on_mismatch() {
        // Arrange
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Body {
            title: String,
        }
        let event = record("goal-9", 4, 0);

        // Act
        let result = event.decode_payload::<Body>();

        // Assert
        match result {
            Err(DomainError::Infrastructure(msg)) => {
                assert!(msg.contains("goal-9"));
                assert!(msg.contains("version 4"));
            }
            other => panic!("expected Infrastructure, got {other:?}"),
        }
    }

    #[test]
    fn test_logged_by_parses_known_values_only() {
        assert_eq!("human".parse::<LoggedBy>().unwrap(), LoggedBy::Human);
        assert_eq!("machine".parse::<LoggedBy>().unwrap(), LoggedBy::Machine);
        assert!("robot".parse::<LoggedBy>().is_err());
    }
}
