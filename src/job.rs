//! The job orchestrator: partition, fan out, join, report.
//!
//! A [`Job`] is assembled once with [`JobBuilder`] and may be run any number
//! of times. Each [`run`](Job::run) re-reads the key bounds, so it
//! partitions whatever is in the input at that moment and reprocesses the
//! whole domain. Nothing is carried over between runs.
//!
//! ```no_run
//! use chunkbeam::io::memory::VecSource;
//! use chunkbeam::job::Job;
//! use chunkbeam::processor::PassThrough;
//! use chunkbeam::store::memory::InMemoryStore;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryStore::<i64>::new());
//! let job = Job::<i64, i64>::builder("numbers")
//!     .source(Arc::new(VecSource::new((1..=1000_i64).collect())))
//!     .processor(Arc::new(PassThrough))
//!     .writer(store.clone())
//!     .partition_count(2)
//!     .chunk_size(100)
//!     .build()?;
//!
//! let result = job.run().into_result()?;
//! assert_eq!(result.written(), 1000);
//! # Ok(())
//! # }
//! ```

use crate::chunk::{ChunkPipeline, Pipeline};
use crate::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_PARTITION_COUNT, DEFAULT_WORKER_POOL_SIZE, DEFAULT_WORKER_QUEUE_CAPACITY,
    JobConfig,
};
use crate::error::ConfigError;
use crate::handler::{PartitionHandler, WorkerPool};
use crate::io::{KeyDomain, RecordSource};
use crate::metrics::MetricsCollector;
use crate::partition::{ColumnRangePartitioner, Partitioner};
use crate::processor::ItemProcessor;
use crate::record::Keyed;
use crate::result::JobResult;
use crate::skip::{NoopSkipListener, SkipListener, SkipPolicy, default_policy};
use crate::store::{ChunkWriter, ExecutionId, JobRepository};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// A fully wired two-level job: one fan-out step over per-partition
/// [`ChunkPipeline`]s.
pub struct Job<I, O> {
    name: String,
    partitioner: Arc<dyn Partitioner>,
    source: Arc<dyn RecordSource<I>>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ChunkWriter<O>>,
    skip_policy: Arc<dyn SkipPolicy>,
    listener: Arc<dyn SkipListener<I>>,
    repository: Option<Arc<dyn JobRepository>>,
    metrics: Option<MetricsCollector>,
    partition_count: usize,
    chunk_size: usize,
    handler: PartitionHandler,
}

impl<I, O> Job<I, O> {
    pub fn builder(name: impl Into<String>) -> JobBuilder<I, O> {
        JobBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.partition_count
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn handler(&self) -> &PartitionHandler {
        &self.handler
    }

    #[must_use]
    pub fn metrics(&self) -> Option<&MetricsCollector> {
        self.metrics.as_ref()
    }
}

impl<I: Keyed + 'static, O: 'static> Job<I, O> {
    /// A pipeline bound to this job's collaborators, shared by every
    /// partition of one run.
    fn pipeline(&self) -> Arc<dyn Pipeline> {
        Arc::new(
            ChunkPipeline::new(
                Arc::clone(&self.source),
                Arc::clone(&self.processor),
                Arc::clone(&self.writer),
                self.chunk_size,
            )
            .with_skip_policy(Arc::clone(&self.skip_policy))
            .with_listener(Arc::clone(&self.listener)),
        )
    }

    /// Run the job to completion and return its outcome.
    ///
    /// Blocks until every partition has finished. Never panics on data,
    /// I/O or worker failures: they are all reported in the [`JobResult`].
    pub fn run(&self) -> JobResult {
        let started = Instant::now();
        info!(
            job = %self.name,
            partitions = self.partition_count,
            chunk_size = self.chunk_size,
            workers = self.handler.pool().size(),
            "job started"
        );
        let execution = self.start_execution();

        let mut result = match self.partitioner.partition(self.partition_count) {
            Ok(descriptors) => self.handler.execute(descriptors, self.pipeline()),
            Err(e) => {
                error!(job = %self.name, error = %e, "job could not be partitioned");
                JobResult::not_started(e)
            }
        };
        result.elapsed = started.elapsed();

        if let Some(execution) = execution {
            self.finish_execution(execution, &result);
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_job(&result);
        }

        match &result.error {
            None => info!(
                job = %self.name,
                status = %result.status,
                partitions = result.partitions.len(),
                written = result.written(),
                skipped = result.skip_count,
                elapsed_ms = result.elapsed.as_millis(),
                "job finished"
            ),
            Some(e) => error!(
                job = %self.name,
                status = %result.status,
                skipped = result.skip_count,
                error = %e,
                "job finished"
            ),
        }
        result
    }

    fn start_execution(&self) -> Option<ExecutionId> {
        let repo = self.repository.as_ref()?;
        match repo.start_job(&self.name) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(job = %self.name, error = %e, "failed to record job start");
                None
            }
        }
    }

    fn finish_execution(&self, execution: ExecutionId, result: &JobResult) {
        let Some(repo) = &self.repository else {
            return;
        };
        for partition in &result.partitions {
            if let Err(e) = repo.record_partition(execution, partition) {
                warn!(
                    job = %self.name,
                    execution,
                    partition = %partition.name(),
                    error = %e,
                    "failed to record partition"
                );
            }
        }
        if let Err(e) = repo.finish_job(execution, result) {
            warn!(job = %self.name, execution, error = %e, "failed to record job finish");
        }
    }
}

/// Assembles a [`Job`]. Source, processor and writer are required.
pub struct JobBuilder<I, O> {
    name: String,
    partitioner: Option<Arc<dyn Partitioner>>,
    /// Key bounds of the current source, used when no partitioner is set.
    domain: Option<Arc<dyn KeyDomain>>,
    source: Option<Arc<dyn RecordSource<I>>>,
    processor: Option<Arc<dyn ItemProcessor<I, O>>>,
    writer: Option<Arc<dyn ChunkWriter<O>>>,
    skip_policy: Arc<dyn SkipPolicy>,
    listener: Arc<dyn SkipListener<I>>,
    repository: Option<Arc<dyn JobRepository>>,
    metrics: Option<MetricsCollector>,
    partition_count: usize,
    chunk_size: usize,
    worker_pool_size: usize,
    worker_queue_capacity: usize,
}

impl<I, O> JobBuilder<I, O> {
    /// Defaults match [`JobConfig::default`], including the default skip policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitioner: None,
            domain: None,
            source: None,
            processor: None,
            writer: None,
            skip_policy: Arc::new(default_policy()),
            listener: Arc::new(NoopSkipListener),
            repository: None,
            metrics: None,
            partition_count: DEFAULT_PARTITION_COUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            worker_queue_capacity: DEFAULT_WORKER_QUEUE_CAPACITY,
        }
    }

    /// Take name, sizes and skip policy from `config`.
    #[must_use]
    pub fn config(mut self, config: &JobConfig) -> Self {
        self.name.clone_from(&config.job_name);
        self.partition_count = config.partition_count;
        self.chunk_size = config.chunk_size;
        self.worker_pool_size = config.worker_pool_size;
        self.worker_queue_capacity = config.worker_queue_capacity;
        self.skip_policy = config.skip.policy();
        self
    }

    /// The record source. Unless a [`partitioner`](Self::partitioner) is
    /// set, it also provides the key bounds to partition. Calling this again
    /// replaces both.
    #[must_use]
    pub fn source<S>(mut self, source: Arc<S>) -> Self
    where
        S: RecordSource<I> + 'static,
    {
        let domain: Arc<dyn KeyDomain> = source.clone();
        self.domain = Some(domain);
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = Some(partitioner);
        self
    }

    #[must_use]
    pub fn processor(mut self, processor: Arc<dyn ItemProcessor<I, O>>) -> Self {
        self.processor = Some(processor);
        self
    }

    #[must_use]
    pub fn writer(mut self, writer: Arc<dyn ChunkWriter<O>>) -> Self {
        self.writer = Some(writer);
        self
    }

    #[must_use]
    pub fn skip_policy(mut self, policy: Arc<dyn SkipPolicy>) -> Self {
        self.skip_policy = policy;
        self
    }

    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn SkipListener<I>>) -> Self {
        self.listener = listener;
        self
    }

    #[must_use]
    pub fn repository(mut self, repository: Arc<dyn JobRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn partition_count(mut self, n: usize) -> Self {
        self.partition_count = n;
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n;
        self
    }

    #[must_use]
    pub fn worker_pool_size(mut self, n: usize) -> Self {
        self.worker_pool_size = n;
        self
    }

    #[must_use]
    pub fn worker_queue_capacity(mut self, n: usize) -> Self {
        self.worker_queue_capacity = n;
        self
    }

    /// # Errors
    /// [`ConfigError::Missing`] if a required collaborator was not set,
    /// [`ConfigError::MustBePositive`] for a zero size, or
    /// [`ConfigError::WorkerPool`] if the worker threads cannot be started.
    pub fn build(self) -> Result<Job<I, O>, ConfigError> {
        let source = self.source.ok_or(ConfigError::Missing("source"))?;
        let partitioner: Arc<dyn Partitioner> = match (self.partitioner, self.domain) {
            (Some(explicit), _) => explicit,
            (None, Some(domain)) => Arc::new(ColumnRangePartitioner::new(domain)),
            (None, None) => return Err(ConfigError::Missing("partitioner")),
        };
        let processor = self.processor.ok_or(ConfigError::Missing("processor"))?;
        let writer = self.writer.ok_or(ConfigError::Missing("writer"))?;
        for (field, value) in [
            ("partition_count", self.partition_count),
            ("chunk_size", self.chunk_size),
        ] {
            if value == 0 {
                return Err(ConfigError::MustBePositive { field, value });
            }
        }
        let pool = WorkerPool::new(self.worker_pool_size, self.worker_queue_capacity)?;

        Ok(Job {
            name: self.name,
            partitioner,
            source,
            processor,
            writer,
            skip_policy: self.skip_policy,
            listener: self.listener,
            repository: self.repository,
            metrics: self.metrics,
            partition_count: self.partition_count,
            chunk_size: self.chunk_size,
            handler: PartitionHandler::new(pool),
        })
    }
}

/// Wire the customer import described by `config`: CSV input, the
/// [`CustomerProcessor`](crate::processor::CustomerProcessor), a `SQLite`
/// customer table and job repository in `config.output.database`, skipped
/// records logged as JSON, and a fresh [`MetricsCollector`].
///
/// # Errors
/// Returns an error if the configuration is invalid or the database cannot
/// be opened.
#[cfg(all(feature = "io-csv", feature = "store-sqlite"))]
pub fn customer_import_job(
    config: &JobConfig,
) -> anyhow::Result<Job<crate::record::Customer, crate::record::Customer>> {
    use crate::io::csv::CsvCustomerSource;
    use crate::processor::CustomerProcessor;
    use crate::record::Customer;
    use crate::skip::LoggingSkipListener;
    use crate::store::sqlite::{SqliteCustomerStore, SqliteJobRepository};
    use anyhow::Context;

    config.validate()?;
    let database = &config.output.database;
    let store = SqliteCustomerStore::open(database)
        .with_context(|| format!("open customer store {}", database.display()))?;
    let repository = SqliteJobRepository::open(database)
        .with_context(|| format!("open job repository {}", database.display()))?;
    let source = CsvCustomerSource::new(&config.input.path, config.input.csv_options()?);

    let job = Job::<Customer, Customer>::builder(config.job_name.as_str())
        .config(config)
        .source(Arc::new(source))
        .processor(Arc::new(CustomerProcessor))
        .writer(Arc::new(store))
        .listener(Arc::new(LoggingSkipListener))
        .repository(Arc::new(repository))
        .metrics(MetricsCollector::new())
        .build()?;
    Ok(job)
}
