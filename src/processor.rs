//! Record transforms.
//!
//! An [`ItemProcessor`] turns one input record into one output record or a
//! [`TransformError`]. It is shared by every partition worker, so it must not
//! mutate shared state.

use crate::error::TransformError;
use crate::record::Customer;
use crate::validation::{Validate, ValidationError, ValidationResult, combine_validations, validators};
use chrono::{Datelike, NaiveDate};

pub trait ItemProcessor<I, O>: Send + Sync {
    /// # Errors
    /// Returns a [`TransformError`] when `item` cannot be transformed.
    fn process(&self, item: &I) -> Result<O, TransformError>;
}

impl<I, O, F> ItemProcessor<I, O> for F
where
    F: Fn(&I) -> Result<O, TransformError> + Send + Sync,
{
    fn process(&self, item: &I) -> Result<O, TransformError> {
        self(item)
    }
}

/// Passes records through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl<T: Clone> ItemProcessor<T, T> for PassThrough {
    fn process(&self, item: &T) -> Result<T, TransformError> {
        Ok(item.clone())
    }
}

/// Longest address a mailbox can have.
const MAX_EMAIL_LEN: usize = 254;

/// Date layouts accepted for `dob`, tried in order.
pub const DOB_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%d/%m/%Y"];

/// Length shared by every layout in [`DOB_FORMATS`].
const DOB_LEN: usize = 10;

impl Validate for Customer {
    fn validate(&self) -> ValidationResult {
        combine_validations(vec![
            validators::not_empty("firstName", &self.first_name),
            validators::not_empty("lastName", &self.last_name),
            validators::is_email("email", &self.email),
            validators::max_length("email", &self.email, MAX_EMAIL_LEN),
        ])
    }
}

/// Cleans and checks one customer.
///
/// - every field is trimmed
/// - `contactNo` must be digits once `+`, `-`, spaces and parentheses are
///   stripped; `dob` must parse with one of [`DOB_FORMATS`], with a
///   four-digit year, and is rewritten as `YYYY-MM-DD`. Failures are [`ErrorCategory::MalformedField`](crate::error::ErrorCategory::MalformedField).
/// - names must be present and `email` well-formed. Failures are
///   [`ErrorCategory::Validation`](crate::error::ErrorCategory::Validation).
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerProcessor;

impl CustomerProcessor {
    fn parse_contact(raw: &str) -> Result<String, TransformError> {
        let digits: String = raw
            .chars()
            .filter(|c| !matches!(c, '+' | '-' | ' ' | '(' | ')'))
            .collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(TransformError::malformed(
                "contactNo",
                format!("not a phone number: {raw:?}"),
            ));
        }
        Ok(digits)
    }

    /// `%Y` accepts any number of digits and a sign, so the shape is checked
    /// first and the year must come out as four digits.
    fn parse_dob(raw: &str) -> Result<NaiveDate, TransformError> {
        let malformed = || TransformError::malformed("dob", format!("unrecognized date: {raw:?}"));
        if raw.len() != DOB_LEN || !raw.bytes().all(|b| b.is_ascii_digit() || b == b'-' || b == b'/') {
            return Err(malformed());
        }
        DOB_FORMATS
            .iter()
            .filter_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
            .find(|date| (1000..=9999).contains(&date.year()))
            .ok_or_else(malformed)
    }
}

impl ItemProcessor<Customer, Customer> for CustomerProcessor {
    fn process(&self, item: &Customer) -> Result<Customer, TransformError> {
        let mut out = Customer {
            id: item.id,
            first_name: item.first_name.trim().to_string(),
            last_name: item.last_name.trim().to_string(),
            email: item.email.trim().to_string(),
            gender: item.gender.trim().to_string(),
            contact_no: Self::parse_contact(item.contact_no.trim())?,
            country: item.country.trim().to_string(),
            dob: String::new(),
        };
        out.dob = Self::parse_dob(item.dob.trim())?.format("%Y-%m-%d").to_string();

        out.validate().map_err(|errors| validation_failure(&errors))?;
        Ok(out)
    }
}

fn validation_failure(errors: &[ValidationError]) -> TransformError {
    let field = errors.first().and_then(|e| e.field.clone()).unwrap_or_default();
    let message = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    TransformError::validation(field, message)
}
