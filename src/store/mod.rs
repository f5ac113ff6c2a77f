//! Output collaborators: the destination store and the job repository.
//!
//! A [`ChunkWriter`] receives one chunk at a time and must commit it
//! atomically: either every record of the chunk is persisted or none is.
//! Duplicate keys are the writer's concern; the engine never deduplicates.
//!
//! A [`JobRepository`] keeps one execution record per run, created when the
//! run starts and finalized with its [`JobResult`].

use crate::error::{StoreError, WriteError};
use crate::result::{JobResult, PartitionResult};

pub mod memory;

#[cfg_attr(docsrs, doc(cfg(feature = "store-sqlite")))]
#[cfg(feature = "store-sqlite")]
pub mod sqlite;

/// Persists chunks of records, one transaction per chunk.
pub trait ChunkWriter<T>: Send + Sync {
    /// Write every record in `chunk`, or none of them.
    ///
    /// # Errors
    /// Returns [`WriteError`] after rolling the whole chunk back.
    fn write_chunk(&self, chunk: &[T]) -> Result<(), WriteError>;
}

/// Identifier of one job execution in a [`JobRepository`].
pub type ExecutionId = i64;

/// Bookkeeping for job executions.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn JobRepository>`.
pub trait JobRepository: Send + Sync {
    /// Create the execution record for a run that is starting.
    ///
    /// # Errors
    /// Returns [`StoreError`] on storage failure.
    fn start_job(&self, job_name: &str) -> Result<ExecutionId, StoreError>;

    /// Record one finished partition of `execution`.
    ///
    /// # Errors
    /// Returns [`StoreError`] on storage failure or an unknown execution.
    fn record_partition(&self, execution: ExecutionId, result: &PartitionResult) -> Result<(), StoreError>;

    /// Finalize `execution` with the job's terminal result.
    ///
    /// # Errors
    /// Returns [`StoreError`] on storage failure or an unknown execution.
    fn finish_job(&self, execution: ExecutionId, result: &JobResult) -> Result<(), StoreError>;
}
