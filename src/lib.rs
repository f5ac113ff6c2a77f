//! # Chunkbeam
//!
//! A **partitioned, chunk-oriented batch import engine** for Rust. Chunkbeam
//! splits a keyed input into contiguous key ranges, runs one
//! read → process → write pipeline per range on a bounded worker pool, and
//! commits output in fixed-size transactional chunks. Per-record failures go
//! through a pluggable skip policy instead of aborting the run.
//!
//! ## Key Features
//!
//! - **Range partitioning** - equal-width, disjoint, total key ranges
//! - **Chunked commits** - one atomic write per `chunk_size` records
//! - **Skip policies** - category allow-lists, per-partition ceilings, or any closure
//! - **Bounded parallelism** - fixed worker pool with a blocking submission queue
//! - **Structured outcomes** - `run()` never panics; it returns a [`JobResult`]
//! - **Batteries for the customer import** - CSV input and `SQLite` output
//!   (optional via feature flags)
//!
//! ## Quick Start
//!
//! ```no_run
//! use chunkbeam::*;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let customers = chunkbeam::testing::sample_customers(1200);
//! let store = Arc::new(InMemoryStore::<Customer>::new());
//!
//! let job = Job::<Customer, Customer>::builder("importCustomers")
//!     .source(Arc::new(VecSource::new(customers)))
//!     .processor(Arc::new(CustomerProcessor))
//!     .writer(store.clone())
//!     .build()?;
//!
//! let result = job.run();
//! assert_eq!(result.status, BatchStatus::Completed);
//! assert_eq!(store.len(), 1200);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | feature        | enables                                                   |
//! |----------------|-----------------------------------------------------------|
//! | `io-csv`       | [`io::csv::CsvCustomerSource`]                            |
//! | `store-sqlite` | `SqliteCustomerStore` and `SqliteJobRepository`           |
//!
//! Both are on by default.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.

pub mod chunk;
pub mod config;
pub mod error;
pub mod handler;
pub mod io;
pub mod job;
pub mod metrics;
pub mod partition;
pub mod processor;
pub mod record;
pub mod result;
pub mod skip;
pub mod store;
pub mod testing;
pub mod validation;

// General re-exports
pub use chunk::{ChunkPipeline, Pipeline};
pub use config::JobConfig;
pub use error::{
    ConfigError, ErrorCategory, InvalidDomainError, JobError, PartitionFailure, ReadError, StoreError,
    TransformError, WriteError,
};
pub use handler::{PartitionHandler, WorkerPool};
pub use io::memory::VecSource;
pub use io::{KeyDomain, RecordSource};
pub use job::{Job, JobBuilder};
pub use metrics::MetricsCollector;
pub use partition::{ColumnRangePartitioner, KeyRange, PartitionDescriptor, Partitioner, split_range};
pub use processor::{CustomerProcessor, ItemProcessor, PassThrough};
pub use record::{Customer, Keyed};
pub use result::{BatchStatus, JobResult, PartitionCounts, PartitionResult};
pub use skip::{
    AllowListSkipPolicy, AlwaysSkip, LimitSkipPolicy, LoggingSkipListener, NeverSkip, SkipDecision,
    SkipListener, SkipOutcome, SkipPolicy, default_policy,
};
pub use store::memory::{InMemoryJobRepository, InMemoryStore};
pub use store::{ChunkWriter, JobRepository};

// Gated re-exports
#[cfg(feature = "io-csv")]
pub use io::csv::{CsvCustomerSource, CsvOptions};

#[cfg(feature = "store-sqlite")]
pub use store::sqlite::{SqliteCustomerStore, SqliteJobRepository};

#[cfg(all(feature = "io-csv", feature = "store-sqlite"))]
pub use job::customer_import_job;
