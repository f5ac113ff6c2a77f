//! Range partitioning of the key domain.
//!
//! The key domain `[min, max]` is cut into contiguous, non-overlapping,
//! closed sub-ranges of equal width (the last one clamped to `max`):
//!
//! ```text
//! width = ceil((max - min + 1) / target_count)
//! partition{i} = [min + i*width, min + (i+1)*width - 1]
//! ```
//!
//! When `target_count` exceeds the number of keys, ranges that would start
//! past `max` are not emitted, so every descriptor is non-empty and their
//! union is exactly `[min, max]`.

use crate::error::{InvalidDomainError, JobError};
use crate::io::KeyDomain;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A closed range of partition keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    pub min: i64,
    pub max: i64,
}

impl KeyRange {
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn contains(&self, key: i64) -> bool {
        self.min <= key && key <= self.max
    }

    /// Number of keys in the range.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn width(&self) -> u128 {
        (i128::from(self.max) - i128::from(self.min) + 1) as u128
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// One partition of the key domain, processed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    /// Position in the partitioner's output.
    pub index: usize,
    /// Deterministic name, `partition{index}`.
    pub name: String,
    pub min_key: i64,
    pub max_key: i64,
}

impl PartitionDescriptor {
    #[must_use]
    pub fn new(index: usize, min_key: i64, max_key: i64) -> Self {
        Self {
            index,
            name: format!("partition{index}"),
            min_key,
            max_key,
        }
    }

    #[must_use]
    pub const fn range(&self) -> KeyRange {
        KeyRange::new(self.min_key, self.max_key)
    }
}

/// Split `[min, max]` into at most `target_count` contiguous sub-ranges.
///
/// Pure arithmetic; see the module docs for the exact layout.
///
/// # Errors
/// [`InvalidDomainError`] if `max < min` or `target_count == 0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn split_range(
    min: i64,
    max: i64,
    target_count: usize,
) -> Result<Vec<PartitionDescriptor>, InvalidDomainError> {
    if target_count == 0 {
        return Err(InvalidDomainError::NoPartitions);
    }
    if max < min {
        return Err(InvalidDomainError::InvertedRange { min, max });
    }

    let domain = KeyRange::new(min, max);
    let width = domain.width().div_ceil(target_count as u128) as i128;
    let (lo_bound, hi_bound) = (i128::from(min), i128::from(max));

    let mut out = Vec::with_capacity(target_count);
    for index in 0..target_count {
        let lo = lo_bound + index as i128 * width;
        if lo > hi_bound {
            break;
        }
        let hi = (lo + width - 1).min(hi_bound);
        // both ends lie inside [min, max], so they fit in i64
        out.push(PartitionDescriptor::new(index, lo as i64, hi as i64));
    }
    Ok(out)
}

/// Produces the partition descriptors for one run.
pub trait Partitioner: Send + Sync {
    /// # Errors
    /// [`JobError::InvalidDomain`] on a bad target count or key domain, or
    /// [`JobError::Domain`] when the key bounds cannot be read.
    fn partition(&self, target_count: usize) -> Result<Vec<PartitionDescriptor>, JobError>;
}

/// Partitions over a column's `[min, max]` as reported by the input.
///
/// Bounds are re-read on every call, so each run partitions the data that
/// is present at that moment.
pub struct ColumnRangePartitioner {
    domain: Arc<dyn KeyDomain>,
}

impl ColumnRangePartitioner {
    pub fn new(domain: Arc<dyn KeyDomain>) -> Self {
        Self { domain }
    }
}

impl Partitioner for ColumnRangePartitioner {
    fn partition(&self, target_count: usize) -> Result<Vec<PartitionDescriptor>, JobError> {
        if target_count == 0 {
            return Err(InvalidDomainError::NoPartitions.into());
        }
        let Some(bounds) = self.domain.key_bounds().map_err(JobError::Domain)? else {
            warn!("input is empty, nothing to partition");
            return Ok(Vec::new());
        };
        let parts = split_range(bounds.min, bounds.max, target_count)?;
        debug!(
            domain = %bounds,
            requested = target_count,
            produced = parts.len(),
            "partitioned key domain"
        );
        Ok(parts)
    }
}

/// A fixed domain, for callers that already know their bounds.
impl Partitioner for KeyRange {
    fn partition(&self, target_count: usize) -> Result<Vec<PartitionDescriptor>, JobError> {
        Ok(split_range(self.min, self.max, target_count)?)
    }
}
