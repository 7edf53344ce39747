//! Worklog CLI error types.

use serde::Serialize;
use thiserror::Error;
use worklog_core::error::DomainError;
use worklog_projection_store::{DbError, MigrationError};
use worklog_rebuild::RebuildError;

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A destructive command was run without confirmation.
    #[error("refused: {0}")]
    Refused(String),

    /// A command was rejected or a query failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Discovering, verifying or applying migrations failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Opening or closing the projection database failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// A projection query failed.
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// A rebuild stopped before finishing.
    #[error(transparent)]
    Rebuild(#[from] RebuildError),

    /// Command output could not be encoded.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// JSON body printed for a failed command.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

impl AppError {
    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Refused(_) => "refused",
            Self::Domain(DomainError::AggregateNotFound(_)) => "aggregate_not_found",
            Self::Domain(DomainError::Precondition(_)) => "precondition_failed",
            Self::Domain(DomainError::Validation(_)) => "validation_error",
            Self::Domain(DomainError::ConcurrencyConflict { .. }) => "concurrency_conflict",
            Self::Domain(DomainError::VersionGap { .. }) => "corrupt_history",
            Self::Domain(DomainError::Infrastructure(_)) | Self::Query(_) | Self::Output(_) => {
                "infrastructure_error"
            }
            Self::Migration(MigrationError::ChecksumMismatch(_)) => "checksum_mismatch",
            Self::Migration(_) => "migration_error",
            Self::Database(_) => "database_error",
            Self::Rebuild(_) => "rebuild_failed",
        }
    }

    /// Process exit code: 1 for rejected commands, 2 for bad configuration
    /// or usage, 3 for storage failures.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Domain(
                DomainError::AggregateNotFound(_)
                | DomainError::Precondition(_)
                | DomainError::Validation(_)
                | DomainError::ConcurrencyConflict { .. },
            ) => 1,
            Self::Config(_) | Self::Refused(_) => 2,
            _ => 3,
        }
    }

    /// Returns the JSON body describing this error.
    #[must_use]
    pub fn body(&self) -> serde_json::Value {
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        serde_json::json!(body)
    }
}
