//! Input validation for command methods.
//!
//! A [`Validator`] checks every declared rule and keeps going after a
//! failure, so the caller sees all violations at once instead of fixing
//! them one round trip at a time.

use std::fmt;

use crate::error::DomainError;

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// The offending input field.
    pub field: String,
    /// What was wrong with it.
    pub message: String,
}

/// Every violation found while validating one command, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldViolation>);

impl ValidationErrors {
    /// Returns the violations.
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    /// Returns true if `field` has at least one violation.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
        }
        Ok(())
    }
}

/// Accumulates field violations for one command.
#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<FieldViolation>,
}

impl Validator {
    /// Creates an empty validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn violate(&mut self, field: &str, message: String) {
        self.violations.push(FieldViolation {
            field: field.to_owned(),
            message,
        });
    }

    /// The value must contain at least one non-whitespace character.
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.violate(field, "is required".to_owned());
        }
        self
    }

    /// The value must be at most `max` characters long.
    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        let len = value.chars().count();
        if len > max {
            self.violate(
                field,
                format!("must be at most {max} characters (got {len})"),
            );
        }
        self
    }

    /// The value must be one of `allowed`.
    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            self.violate(
                field,
                format!("must be one of {} (got '{value}')", allowed.join(", ")),
            );
        }
        self
    }

    /// Finishes validation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` carrying every recorded violation if
    /// any rule failed.
    pub fn finish(&mut self) -> Result<(), DomainError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(ValidationErrors(std::mem::take(
                &mut self.violations,
            ))))
        }
    }
}
