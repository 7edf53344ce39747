//! On-disk naming for event files.

use worklog_core::error::DomainError;
use worklog_core::validation::{FieldViolation, ValidationErrors};

/// Builds the file name for the record stored at `seq`.
#[must_use]
pub fn event_file_name(seq: u64, event_type: &str) -> String {
    format!("{seq:06}.{event_type}.json")
}

/// Name of the scratch file a record is written to before it is renamed
/// into place. The leading dot keeps it out of [`parse_seq`].
#[must_use]
pub(crate) fn temp_file_name(seq: u64) -> String {
    format!(".{seq:06}.json.tmp")
}

/// Extracts the storage position from an event file name, or `None` if the
/// name is not an event file.
#[must_use]
pub fn parse_seq(file_name: &str) -> Option<u64> {
    let stem = file_name.strip_suffix(".json")?;
    let (seq, event_type) = stem.split_once('.')?;
    if seq.is_empty() || event_type.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seq.parse().ok()
}

/// Checks that `value` can be used as a single path segment.
///
/// # Errors
///
/// Returns `DomainError::Validation` naming `field` if `value` is empty,
/// starts with a dot, or contains a path separator or NUL.
pub fn validate_segment(field: &str, value: &str) -> Result<(), DomainError> {
    let message = if value.is_empty() {
        Some("must not be empty")
    } else if value.starts_with('.') {
        Some("must not start with '.'")
    } else if value.contains(['/', '\\', '\0']) {
        Some("must not contain path separators")
    } else {
        None
    };

    match message {
        None => Ok(()),
        Some(message) => Err(DomainError::Validation(ValidationErrors(vec![
            FieldViolation {
                field: field.to_owned(),
                message: format!("{message} (got '{value}')"),
            },
        ]))),
    }
}

/// Checks that a record version is a valid stream position.
///
/// # Errors
///
/// Returns `DomainError::Validation` if `version` is below 1.
pub fn validate_version(version: i64) -> Result<(), DomainError> {
    if version >= 1 {
        return Ok(());
    }
    Err(DomainError::Validation(ValidationErrors(vec![
        FieldViolation {
            field: "version".to_owned(),
            message: format!("must be at least 1 (got {version})"),
        },
    ])))
}
