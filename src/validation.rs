//! Field-level validation rules.
//!
//! Implement [`Validate`] on a record type to describe its business rules;
//! processors turn a failed validation into a
//! [`TransformError`](crate::error::TransformError) of category
//! `Validation`, which the skip policy then classifies.
//!
//! # Example
//!
//! ```
//! use chunkbeam::validation::*;
//!
//! struct Signup {
//!     email: String,
//!     handle: String,
//! }
//!
//! impl Validate for Signup {
//!     fn validate(&self) -> ValidationResult {
//!         combine_validations(vec![
//!             validators::is_email("email", &self.email),
//!             validators::max_length("handle", &self.handle, 16),
//!         ])
//!     }
//! }
//!
//! let bad = Signup { email: "nope".into(), handle: "ok".into() };
//! assert_eq!(bad.validate().unwrap_err().len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for validation operations.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Trait for types that can be validated.
pub trait Validate {
    /// Validate this instance and return a list of errors if invalid.
    fn validate(&self) -> ValidationResult;
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The field that failed validation (optional)
    pub field: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error with just a message.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    /// Create a validation error for a specific field.
    pub fn field<S: Into<String>, M: Into<String>>(field: S, message: M) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref field) = self.field {
            write!(f, "[{}] {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validation helpers for common patterns.
pub mod validators {
    use super::{ValidationError, ValidationResult};

    /// Validate that a string is not empty (after trimming).
    pub fn not_empty(field: &str, value: &str) -> ValidationResult {
        if value.trim().is_empty() {
            Err(vec![ValidationError::field(field, "must not be empty")])
        } else {
            Ok(())
        }
    }

    /// Validate that a string matches a basic email pattern.
    pub fn is_email(field: &str, value: &str) -> ValidationResult {
        // non-empty local part, domain with a dot that is not the last char
        if let Some((local, domain)) = value.split_once('@')
            && !local.is_empty()
            && !domain.contains('@')
            && domain.rfind('.').is_some_and(|dot| dot > 0 && dot < domain.len() - 1)
        {
            return Ok(());
        }
        Err(vec![ValidationError::field(field, "invalid email format")])
    }

    /// Validate maximum length.
    pub fn max_length(field: &str, value: &str, max: usize) -> ValidationResult {
        if value.chars().count() <= max {
            Ok(())
        } else {
            Err(vec![ValidationError::field(
                field,
                format!("must have at most {max} characters"),
            )])
        }
    }
}

/// Combine multiple validation results.
pub fn combine_validations(results: Vec<ValidationResult>) -> ValidationResult {
    let mut all_errors = Vec::new();
    for result in results {
        if let Err(mut errors) = result {
            all_errors.append(&mut errors);
        }
    }
    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors)
    }
}
