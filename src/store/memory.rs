//! In-memory store and job repository.

use crate::error::{StoreError, WriteError};
use crate::result::{BatchStatus, JobResult, PartitionResult};
use crate::store::{ChunkWriter, ExecutionId, JobRepository};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Keeps every committed chunk, in commit order.
///
/// Chunks from different partitions interleave in whatever order their
/// workers committed them.
#[derive(Debug)]
pub struct InMemoryStore<T> {
    chunks: Mutex<Vec<Vec<T>>>,
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self {
            chunks: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> InMemoryStore<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All committed records, flattened in commit order.
    #[must_use]
    pub fn records(&self) -> Vec<T> {
        self.chunks.lock().iter().flatten().cloned().collect()
    }

    /// Committed chunks, in commit order.
    #[must_use]
    pub fn chunks(&self) -> Vec<Vec<T>> {
        self.chunks.lock().clone()
    }

    #[must_use]
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.lock().iter().map(Vec::len).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.lock().iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> ChunkWriter<T> for InMemoryStore<T> {
    fn write_chunk(&self, chunk: &[T]) -> Result<(), WriteError> {
        self.chunks.lock().push(chunk.to_vec());
        Ok(())
    }
}

/// One run as tracked by [`InMemoryJobRepository`].
#[derive(Debug, Clone)]
pub struct JobExecution {
    pub id: ExecutionId,
    pub job_name: String,
    /// `None` while the run is in progress.
    pub status: Option<BatchStatus>,
    pub partitions: Vec<PartitionResult>,
    pub skip_count: u64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Process-local job repository.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    executions: Mutex<Vec<JobExecution>>,
}

impl InMemoryJobRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn executions(&self) -> Vec<JobExecution> {
        self.executions.lock().clone()
    }

    #[must_use]
    pub fn execution(&self, id: ExecutionId) -> Option<JobExecution> {
        self.executions.lock().iter().find(|e| e.id == id).cloned()
    }

    fn with_execution<R>(
        &self,
        id: ExecutionId,
        f: impl FnOnce(&mut JobExecution) -> R,
    ) -> Result<R, StoreError> {
        let mut executions = self.executions.lock();
        let execution = executions
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::UnknownExecution(id))?;
        Ok(f(execution))
    }
}

impl JobRepository for InMemoryJobRepository {
    fn start_job(&self, job_name: &str) -> Result<ExecutionId, StoreError> {
        let mut executions = self.executions.lock();
        let id = executions.last().map_or(1, |e| e.id + 1);
        executions.push(JobExecution {
            id,
            job_name: job_name.to_string(),
            status: None,
            partitions: Vec::new(),
            skip_count: 0,
            error_message: None,
            started_at: Utc::now(),
            finished_at: None,
        });
        Ok(id)
    }

    fn record_partition(&self, execution: ExecutionId, result: &PartitionResult) -> Result<(), StoreError> {
        self.with_execution(execution, |e| e.partitions.push(result.clone()))
    }

    fn finish_job(&self, execution: ExecutionId, result: &JobResult) -> Result<(), StoreError> {
        self.with_execution(execution, |e| {
            e.status = Some(result.status);
            e.skip_count = result.skip_count;
            e.error_message = result.error.as_ref().map(ToString::to_string);
            e.finished_at = Some(Utc::now());
        })
    }
}
