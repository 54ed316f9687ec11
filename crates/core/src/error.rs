//! # Error Module
//!
//! Domain errors for Biogate, built with thiserror.

use thiserror::Error;

/// Core domain errors.
///
/// Parsing and validation failures of domain values. Infrastructure errors
/// live in the persistence crate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    // === Parse errors ===
    #[error("Invalid {field} value: {value}")]
    InvalidEnumValue { field: String, value: String },

    #[error("Invalid days_of_week: {0} (expected digits 1-7, Monday = 1)")]
    InvalidDaysOfWeek(String),

    // === Range errors ===
    #[error("Invalid time window: start {start} is after end {end}")]
    InvalidTimeWindow { start: String, end: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("Invalid finger index: {0} (expected 1-10)")]
    InvalidFingerIndex(i64),

    // === Validation errors ===
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Build an InvalidEnumValue error
    pub fn invalid_enum(field: &str, value: &str) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Check whether this is a range error
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidTimeWindow { .. } | CoreError::InvalidDateRange { .. }
        )
    }
}
