//! Job configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration for the customer import:
//!
//! ```toml
//! job_name = "importCustomers"
//! partition_count = 2
//! chunk_size = 500
//! worker_pool_size = 4
//! worker_queue_capacity = 4
//!
//! [skip]
//! skippable = ["malformed_field"]
//! # limit = 100
//!
//! [input]
//! path = "customers.csv"
//! delimiter = ","
//! has_headers = true
//!
//! [output]
//! database = "customers.db"
//! ```
//!
//! Partition count and worker pool size are independent: partitions are
//! decided up front and simply queue for whichever worker is free.

use crate::error::{ConfigError, ErrorCategory};
use crate::skip::{AllowListSkipPolicy, SkipPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_JOB_NAME: &str = "importCustomers";
pub const DEFAULT_PARTITION_COUNT: usize = 2;
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;
pub const DEFAULT_WORKER_QUEUE_CAPACITY: usize = 4;

/// Settings for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub job_name: String,
    /// Target number of partitions, `>= 1`.
    pub partition_count: usize,
    /// Records per committed chunk, `>= 1`.
    pub chunk_size: usize,
    /// Worker threads, `>= 1`.
    pub worker_pool_size: usize,
    /// Partitions that may wait for a worker before submission blocks.
    pub worker_queue_capacity: usize,
    pub skip: SkipConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            partition_count: DEFAULT_PARTITION_COUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            worker_queue_capacity: DEFAULT_WORKER_QUEUE_CAPACITY,
            skip: SkipConfig::default(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl JobConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML, or any error from [`validate`](Self::validate).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] if the file cannot be read or parsed, or any
    /// error from [`validate`](Self::validate).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// # Errors
    /// [`ConfigError::MustBePositive`] for a zero count or size, and
    /// [`ConfigError::Delimiter`] for a delimiter that is not one ASCII byte.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("partition_count", self.partition_count),
            ("chunk_size", self.chunk_size),
            ("worker_pool_size", self.worker_pool_size),
        ] {
            if value == 0 {
                return Err(ConfigError::MustBePositive { field, value });
            }
        }
        self.input.delimiter_byte()?;
        Ok(())
    }
}

/// Which transform failures are tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipConfig {
    /// Categories that are skipped instead of failing the partition.
    pub skippable: Vec<ErrorCategory>,
    /// Per-partition ceiling on skips; `None` means unlimited.
    pub limit: Option<u64>,
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            skippable: vec![ErrorCategory::MalformedField],
            limit: None,
        }
    }
}

impl SkipConfig {
    /// Build the configured policy.
    #[must_use]
    pub fn policy(&self) -> Arc<dyn SkipPolicy> {
        let allow = AllowListSkipPolicy::new(self.skippable.iter().copied());
        match self.limit {
            Some(limit) => Arc::new(allow.with_limit(limit)),
            None => Arc::new(allow),
        }
    }
}

/// Delimited input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: PathBuf,
    pub delimiter: String,
    /// Whether the first line is a header to skip.
    pub has_headers: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("customers.csv"),
            delimiter: ",".to_string(),
            has_headers: true,
        }
    }
}

impl InputConfig {
    /// # Errors
    /// [`ConfigError::Delimiter`] unless the delimiter is exactly one ASCII byte.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::Delimiter(self.delimiter.clone())),
        }
    }

    /// Tokenizer options for [`CsvCustomerSource`](crate::io::csv::CsvCustomerSource).
    ///
    /// # Errors
    /// [`ConfigError::Delimiter`] on an invalid delimiter.
    #[cfg(feature = "io-csv")]
    pub fn csv_options(&self) -> Result<crate::io::csv::CsvOptions, ConfigError> {
        Ok(crate::io::csv::CsvOptions {
            delimiter: self.delimiter_byte()?,
            has_headers: self.has_headers,
        })
    }
}

/// Destination database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `SQLite` file holding both customers and job executions.
    pub database: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("customers.db"),
        }
    }
}
