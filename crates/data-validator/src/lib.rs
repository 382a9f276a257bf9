//! Sensor Payload Validation
//!
//! Checks that an incoming JSON payload carries every required reading field
//! and coerces each value to a finite `f64`. No range checking is done.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{validate_body, validate_payload, ValidatedReading, REQUIRED_FIELDS};
