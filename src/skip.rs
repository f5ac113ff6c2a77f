//! Skip policies: which per-record transform failures are tolerated.
//!
//! A [`SkipPolicy`] is a pure function of the error and the partition's
//! cumulative skip count. The pipeline consults it for every
//! [`TransformError`]; nothing else (read or write failures) is skippable.
//!
//! Policies compose:
//!
//! ```
//! use chunkbeam::error::{ErrorCategory, TransformError};
//! use chunkbeam::skip::{AllowListSkipPolicy, SkipDecision, SkipPolicy};
//!
//! // tolerate malformed fields, but at most 10 per partition
//! let policy = AllowListSkipPolicy::new([ErrorCategory::MalformedField]).with_limit(10);
//!
//! let bad_number = TransformError::malformed("contactNo", "not a number");
//! assert_eq!(policy.classify(&bad_number, 0), SkipDecision::Skip);
//! assert_eq!(policy.classify(&bad_number, 10), SkipDecision::Fail);
//! ```

use crate::error::{ErrorCategory, TransformError};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

/// What to do with a record whose transform failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipDecision {
    /// Count the record as skipped and continue with the next one.
    Skip,
    /// Abort the partition.
    Fail,
}

/// A decision together with the error it was made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipOutcome {
    pub decision: SkipDecision,
    pub error: TransformError,
}

/// Classifies transform failures as skippable or fatal.
///
/// Implementations must be deterministic: the same error and count always
/// yield the same decision.
pub trait SkipPolicy: Send + Sync {
    fn classify(&self, error: &TransformError, skip_count: u64) -> SkipDecision;

    /// Classify `error` and keep it attached to the decision.
    fn decide(&self, error: TransformError, skip_count: u64) -> SkipOutcome {
        SkipOutcome {
            decision: self.classify(&error, skip_count),
            error,
        }
    }

    /// Wrap this policy with a per-partition skip ceiling.
    fn with_limit(self, limit: u64) -> LimitSkipPolicy<Self>
    where
        Self: Sized,
    {
        LimitSkipPolicy { inner: self, limit }
    }
}

impl<F> SkipPolicy for F
where
    F: Fn(&TransformError, u64) -> SkipDecision + Send + Sync,
{
    fn classify(&self, error: &TransformError, skip_count: u64) -> SkipDecision {
        self(error, skip_count)
    }
}

/// Skips errors whose category is allow-listed, fails everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowListSkipPolicy {
    categories: BTreeSet<ErrorCategory>,
}

impl AllowListSkipPolicy {
    pub fn new(categories: impl IntoIterator<Item = ErrorCategory>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn allows(&self, category: ErrorCategory) -> bool {
        self.categories.contains(&category)
    }
}

impl SkipPolicy for AllowListSkipPolicy {
    fn classify(&self, error: &TransformError, _skip_count: u64) -> SkipDecision {
        if self.allows(error.category) {
            SkipDecision::Skip
        } else {
            SkipDecision::Fail
        }
    }
}

/// Escalates to [`SkipDecision::Fail`] once `limit` records have been skipped.
///
/// With `limit = n`, the first `n` skippable errors are skipped and the
/// `n + 1`-th fails the partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitSkipPolicy<P> {
    inner: P,
    limit: u64,
}

impl<P: SkipPolicy> SkipPolicy for LimitSkipPolicy<P> {
    fn classify(&self, error: &TransformError, skip_count: u64) -> SkipDecision {
        if skip_count >= self.limit {
            return SkipDecision::Fail;
        }
        self.inner.classify(error, skip_count)
    }
}

/// Never skips.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSkip;

impl SkipPolicy for NeverSkip {
    fn classify(&self, _error: &TransformError, _skip_count: u64) -> SkipDecision {
        SkipDecision::Fail
    }
}

/// Skips every transform failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSkip;

impl SkipPolicy for AlwaysSkip {
    fn classify(&self, _error: &TransformError, _skip_count: u64) -> SkipDecision {
        SkipDecision::Skip
    }
}

/// The import job's default: malformed fields are skipped without limit,
/// every other category is fatal.
#[must_use]
pub fn default_policy() -> AllowListSkipPolicy {
    AllowListSkipPolicy::new([ErrorCategory::MalformedField])
}

/// Notified once for every record the pipeline skips.
pub trait SkipListener<I>: Send + Sync {
    fn on_skip(&self, partition: &str, item: &I, error: &TransformError);
}

/// Ignores skips.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSkipListener;

impl<I> SkipListener<I> for NoopSkipListener {
    fn on_skip(&self, _partition: &str, _item: &I, _error: &TransformError) {}
}

/// Logs each skipped record as JSON at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSkipListener;

impl<I: Serialize> SkipListener<I> for LoggingSkipListener {
    fn on_skip(&self, partition: &str, item: &I, error: &TransformError) {
        let record = serde_json::to_string(item)
            .unwrap_or_else(|e| format!("<unserializable: {e}>"));
        warn!(partition, %error, %record, "skipped record");
    }
}
