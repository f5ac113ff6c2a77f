//! Pre-built customer datasets for common testing scenarios.

use crate::record::Customer;

const COUNTRIES: [&str; 5] = ["Canada", "France", "Japan", "Brazil", "Kenya"];

/// A customer that passes [`CustomerProcessor`](crate::processor::CustomerProcessor)
/// unchanged.
///
/// # Example
///
/// ```
/// use chunkbeam::testing::customer;
///
/// let c = customer(7);
/// assert_eq!(c.id, 7);
/// assert_eq!(c.email, "user7@example.com");
/// ```
#[must_use]
pub fn customer(id: i64) -> Customer {
    let n = id.unsigned_abs();
    Customer {
        id,
        first_name: format!("First{id}"),
        last_name: format!("Last{id}"),
        email: format!("user{id}@example.com"),
        gender: if n % 2 == 0 { "Female" } else { "Male" }.to_string(),
        contact_no: format!("555{:07}", n % 10_000_000),
        country: COUNTRIES[(n % COUNTRIES.len() as u64) as usize].to_string(),
        dob: format!("{}-{:02}-{:02}", 1950 + n % 50, 1 + n % 12, 1 + n % 28),
    }
}

/// Valid customers with ids `1..=n`.
///
/// # Example
///
/// ```
/// use chunkbeam::testing::sample_customers;
///
/// let customers = sample_customers(1000);
/// assert_eq!(customers.first().map(|c| c.id), Some(1));
/// assert_eq!(customers.last().map(|c| c.id), Some(1000));
/// ```
#[must_use]
pub fn sample_customers(n: usize) -> Vec<Customer> {
    (1..=n as i64).map(customer).collect()
}

/// A customer whose `contactNo` is not a number (a malformed-field error).
#[must_use]
pub fn customer_with_bad_contact(id: i64) -> Customer {
    Customer {
        contact_no: "call me maybe".to_string(),
        ..customer(id)
    }
}

/// A customer whose `dob` is not a date (a malformed-field error).
#[must_use]
pub fn customer_with_bad_dob(id: i64) -> Customer {
    Customer {
        dob: "31/31/1999".to_string(),
        ..customer(id)
    }
}

/// A customer whose `email` is invalid (a validation error).
#[must_use]
pub fn customer_with_bad_email(id: i64) -> Customer {
    Customer {
        email: "not-an-email".to_string(),
        ..customer(id)
    }
}
