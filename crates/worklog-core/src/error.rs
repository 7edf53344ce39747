//! Domain error types.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No events exist for the requested stream.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(String),

    /// The aggregate's current state does not permit the command.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// One or more command inputs broke their declared rules.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Optimistic concurrency conflict on append.
    #[error("concurrency conflict on stream {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The stream that had the conflict.
        stream_id: String,
        /// The stream version the writer built its record on.
        expected: i64,
        /// The stream version found in storage.
        actual: i64,
    },

    /// A history handed to rehydration is not a contiguous `1..=n` sequence
    /// for one stream.
    #[error("history for stream {stream_id} is out of order: expected version {expected}, found {found}")]
    VersionGap {
        /// The stream being rehydrated.
        stream_id: String,
        /// The version that should have come next.
        expected: i64,
        /// The version that was found instead.
        found: i64,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
