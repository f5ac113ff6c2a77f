//! Error taxonomy for the import engine.
//!
//! Record-level failures ([`TransformError`]) are routed through a
//! [`SkipPolicy`](crate::skip::SkipPolicy) and may be tolerated. Every other
//! error is fatal at the level where it occurs:
//!
//! | error                  | scope     | effect                                   |
//! |------------------------|-----------|------------------------------------------|
//! | [`InvalidDomainError`] | job       | the job never starts                     |
//! | [`ReadError`]          | partition | partition aborts immediately             |
//! | [`TransformError`]     | record    | skipped or escalated by the skip policy  |
//! | [`WriteError`]         | partition | chunk rolled back, partition aborts      |
//! | [`JobError::Aggregate`]| job       | at least one partition failed            |
//!
//! All errors are `Clone` so they can travel inside result values.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse classification of a per-record transform failure.
///
/// Skip policies allow-list categories rather than concrete error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A field could not be parsed into its expected shape (number, date, ...).
    MalformedField,
    /// A field parsed but violates a business rule.
    Validation,
    /// Anything the transform did not anticipate.
    Unexpected,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MalformedField => "malformed_field",
            Self::Validation => "validation",
            Self::Unexpected => "unexpected",
        };
        f.write_str(s)
    }
}

/// A single record failed to transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category} error{}: {message}", field_suffix(.field))]
pub struct TransformError {
    pub category: ErrorCategory,
    /// Offending field, when the failure can be pinned to one.
    pub field: Option<String>,
    pub message: String,
}

impl TransformError {
    pub fn new<M: Into<String>>(category: ErrorCategory, message: M) -> Self {
        Self {
            category,
            field: None,
            message: message.into(),
        }
    }

    /// A field that could not be parsed.
    pub fn malformed<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self {
            category: ErrorCategory::MalformedField,
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// A field that parsed but failed validation.
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self {
            category: ErrorCategory::Validation,
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn unexpected<M: Into<String>>(message: M) -> Self {
        Self::new(ErrorCategory::Unexpected, message)
    }
}

fn field_suffix(field: &Option<String>) -> String {
    field.as_ref().map(|f| format!(" in `{f}`")).unwrap_or_default()
}

fn first_name(failed: &[String]) -> &str {
    failed.first().map_or("?", String::as_str)
}

/// The input could not be read. Distinct from end-of-partition, which is
/// signalled by the cursor returning `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("read error: {message}")]
pub struct ReadError {
    pub message: String,
}

impl ReadError {
    pub fn new<M: Into<String>>(message: M) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ReadError {
    fn from(e: anyhow::Error) -> Self {
        // `{:#}` keeps the whole context chain on one line
        Self::new(format!("{e:#}"))
    }
}

/// A chunk could not be written; the whole chunk was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("write error ({records} records rolled back): {message}")]
pub struct WriteError {
    /// Size of the chunk that was rolled back.
    pub records: usize,
    pub message: String,
}

impl WriteError {
    pub fn new<M: Into<String>>(records: usize, message: M) -> Self {
        Self {
            records,
            message: message.into(),
        }
    }
}

/// The partitioning precondition was violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDomainError {
    #[error("invalid key domain: max ({max}) < min ({min})")]
    InvertedRange { min: i64, max: i64 },

    #[error("invalid key domain: target partition count must be >= 1")]
    NoPartitions,
}

/// Why a single partition ended in FAILED.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionFailure {
    #[error(transparent)]
    Read(#[from] ReadError),

    /// A transform error the skip policy refused to tolerate.
    #[error("record {key}: {error}")]
    Transform { key: i64, error: TransformError },

    #[error(transparent)]
    Write(#[from] WriteError),

    /// The worker running this partition panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Invalid engine or job configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("`{field}` must be >= 1 (got {value})")]
    MustBePositive { field: &'static str, value: usize },

    #[error("`delimiter` must be a single ASCII character (got {0:?})")]
    Delimiter(String),

    #[error("missing required component: {0}")]
    Missing(&'static str),

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Failure of a persistence backend (destination store or job repository).
#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "store-sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown job execution {0}")]
    UnknownExecution(i64),
}

/// Job-level failure surfaced in a [`JobResult`](crate::result::JobResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error(transparent)]
    InvalidDomain(#[from] InvalidDomainError),

    /// Key bounds could not be determined, so no partition was created.
    #[error("failed to scan key domain: {0}")]
    Domain(ReadError),

    /// One or more partitions ended in FAILED.
    #[error("{} of {total} partitions failed; first failure in {}: {first}", .failed.len(), first_name(.failed))]
    Aggregate {
        /// Names of the failed partitions, in partition order.
        failed: Vec<String>,
        total: usize,
        first: PartitionFailure,
    },
}
