//! Partition and job outcomes.

use crate::error::{JobError, PartitionFailure};
use crate::partition::PartitionDescriptor;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Terminal status of a partition or a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Completed,
    Failed,
}

impl BatchStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-partition record counts.
///
/// For a completed partition, `read == written + skipped`. A failed
/// partition may additionally have read records that were neither (the
/// unflushed chunk and the record that failed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartitionCounts {
    pub read: u64,
    pub written: u64,
    pub skipped: u64,
    /// Number of chunks committed.
    pub commits: u64,
}

/// Outcome of one partition's pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionResult {
    pub descriptor: PartitionDescriptor,
    pub status: BatchStatus,
    pub counts: PartitionCounts,
    /// Set iff `status` is [`BatchStatus::Failed`].
    pub failure: Option<PartitionFailure>,
    pub elapsed: Duration,
}

impl PartitionResult {
    #[must_use]
    pub fn completed(descriptor: PartitionDescriptor, counts: PartitionCounts, elapsed: Duration) -> Self {
        Self {
            descriptor,
            status: BatchStatus::Completed,
            counts,
            failure: None,
            elapsed,
        }
    }

    #[must_use]
    pub fn failed(
        descriptor: PartitionDescriptor,
        counts: PartitionCounts,
        failure: PartitionFailure,
        elapsed: Duration,
    ) -> Self {
        Self {
            descriptor,
            status: BatchStatus::Failed,
            counts,
            failure: Some(failure),
            elapsed,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    #[must_use]
    pub fn skip_count(&self) -> u64 {
        self.counts.skipped
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == BatchStatus::Completed
    }
}

/// Outcome of a whole job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub status: BatchStatus,
    /// One entry per partition, in partition order.
    pub partitions: Vec<PartitionResult>,
    /// Sum of skips across all partitions.
    pub skip_count: u64,
    /// Set iff `status` is [`BatchStatus::Failed`].
    pub error: Option<JobError>,
    pub elapsed: Duration,
}

impl JobResult {
    /// Aggregate partition outcomes: FAILED if any partition failed.
    #[must_use]
    pub fn from_partitions(mut partitions: Vec<PartitionResult>) -> Self {
        partitions.sort_by_key(|p| p.descriptor.index);
        let skip_count = partitions.iter().map(PartitionResult::skip_count).sum();
        let failed: Vec<&PartitionResult> = partitions.iter().filter(|p| !p.is_completed()).collect();
        let error = failed.first().map(|first| JobError::Aggregate {
            failed: failed.iter().map(|p| p.name().to_string()).collect(),
            total: partitions.len(),
            first: first
                .failure
                .clone()
                .unwrap_or_else(|| PartitionFailure::Panicked("no failure recorded".into())),
        });
        let status = if failed.is_empty() {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        };
        Self {
            status,
            partitions,
            skip_count,
            error,
            elapsed: Duration::ZERO,
        }
    }

    /// A job that failed before any partition was dispatched.
    #[must_use]
    pub fn not_started(error: JobError) -> Self {
        Self {
            status: BatchStatus::Failed,
            partitions: Vec::new(),
            skip_count: 0,
            error: Some(error),
            elapsed: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == BatchStatus::Completed
    }

    /// Total records written across partitions.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.partitions.iter().map(|p| p.counts.written).sum()
    }

    /// Total records read across partitions.
    #[must_use]
    pub fn read(&self) -> u64 {
        self.partitions.iter().map(|p| p.counts.read).sum()
    }

    /// # Errors
    /// Returns the job's error if it did not complete.
    pub fn into_result(self) -> Result<Self, JobError> {
        match self.error.clone() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}
