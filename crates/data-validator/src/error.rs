//! Validation Error Types

use thiserror::Error;

/// Errors during payload validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// One or more required fields are absent
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// A field is present but not a finite number
    #[error("Invalid data format for {field}: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// Short stable reason suitable for client responses
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MissingFields(_) => "Missing required fields",
            ValidationError::InvalidFormat { .. } => "Invalid data format",
        }
    }

    /// Snake-case kind, used as a metric label
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingFields(_) => "missing_fields",
            ValidationError::InvalidFormat { .. } => "invalid_format",
        }
    }
}
