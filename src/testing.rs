//! Testing utilities for Chunkbeam jobs.
//!
//! This module provides what the crate's own tests use, exposed so that
//! downstream jobs can be tested the same way:
//!
//! - **Fixtures**: valid customers and customers broken in specific fields
//! - **Fault injection**: sources and writers that fail on cue, and a
//!   pipeline that records how partitions were scheduled
//! - **Mock I/O**: temporary CSV inputs and directories
//!
//! # Quick Start
//!
//! ```no_run
//! use chunkbeam::*;
//! use chunkbeam::testing::*;
//! use std::sync::Arc;
//!
//! #[test]
//! fn skips_bad_phone_numbers() -> anyhow::Result<()> {
//!     let mut customers = sample_customers(10);
//!     customers[3] = customer_with_bad_contact(4);
//!
//!     let store = Arc::new(InMemoryStore::<Customer>::new());
//!     let job = Job::<Customer, Customer>::builder("test")
//!         .source(Arc::new(VecSource::new(customers)))
//!         .processor(Arc::new(CustomerProcessor))
//!         .writer(store.clone())
//!         .build()?;
//!
//!     let result = job.run();
//!     assert_eq!(result.skip_count, 1);
//!     assert_eq!(store.len(), 9);
//!     Ok(())
//! }
//! ```

pub mod faults;
pub mod fixtures;

#[cfg(feature = "io-csv")]
pub mod mock_io;

// Re-export commonly used items
pub use faults::*;
pub use fixtures::*;

#[cfg(feature = "io-csv")]
pub use mock_io::*;
