//! Metrics collection and reporting for job runs.
//!
//! A [`MetricsCollector`] accumulates counters and value distributions. The
//! orchestrator publishes each run's [`JobResult`] into it after the join
//! barrier, so partition workers never touch it.
//!
//! # Example
//!
//! ```no_run
//! use chunkbeam::metrics::MetricsCollector;
//!
//! # fn main() -> anyhow::Result<()> {
//! let metrics = MetricsCollector::new();
//! metrics.increment_counter("records_read", 1200);
//! metrics.record_value("partition_duration_ms", 35.0);
//! metrics.log_summary();
//! metrics.save_to_file("metrics.json")?;
//! # Ok(())
//! # }
//! ```

use crate::result::{BatchStatus, JobResult};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const RECORDS_READ: &str = "records_read";
pub const RECORDS_WRITTEN: &str = "records_written";
pub const RECORDS_SKIPPED: &str = "records_skipped";
pub const CHUNKS_COMMITTED: &str = "chunks_committed";
pub const PARTITIONS_COMPLETED: &str = "partitions_completed";
pub const PARTITIONS_FAILED: &str = "partitions_failed";
pub const JOBS_COMPLETED: &str = "jobs_completed";
pub const JOBS_FAILED: &str = "jobs_failed";
pub const PARTITION_DURATION_MS: &str = "partition_duration_ms";
pub const JOB_DURATION_MS: &str = "job_duration_ms";

/// Thread-safe container for job metrics. Cloning shares the same storage.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsCollectorInner>>,
}

#[derive(Default)]
struct MetricsCollectorInner {
    counters: BTreeMap<String, u64>,
    histograms: BTreeMap<String, HistogramMetric>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to a counter, creating it at zero if missing.
    pub fn increment_counter(&self, name: &str, value: u64) {
        *self.inner.lock().counters.entry(name.to_string()).or_insert(0) += value;
    }

    /// Current value of a counter (zero if it was never incremented).
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.inner.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Record one observation in a histogram, creating it if missing.
    pub fn record_value(&self, name: &str, value: f64) {
        self.inner
            .lock()
            .histograms
            .entry(name.to_string())
            .or_insert_with(HistogramMetric::default)
            .record(value);
    }

    /// Statistics for a histogram, if it exists.
    #[must_use]
    pub fn histogram(&self, name: &str) -> Option<HistogramStats> {
        self.inner.lock().histograms.get(name).map(HistogramMetric::stats)
    }

    /// Publish one job run.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_job(&self, result: &JobResult) {
        for p in &result.partitions {
            self.increment_counter(RECORDS_READ, p.counts.read);
            self.increment_counter(RECORDS_WRITTEN, p.counts.written);
            self.increment_counter(RECORDS_SKIPPED, p.counts.skipped);
            self.increment_counter(CHUNKS_COMMITTED, p.counts.commits);
            let status = match p.status {
                BatchStatus::Completed => PARTITIONS_COMPLETED,
                BatchStatus::Failed => PARTITIONS_FAILED,
            };
            self.increment_counter(status, 1);
            self.record_value(PARTITION_DURATION_MS, p.elapsed.as_secs_f64() * 1000.0);
        }
        let job_status = match result.status {
            BatchStatus::Completed => JOBS_COMPLETED,
            BatchStatus::Failed => JOBS_FAILED,
        };
        self.increment_counter(job_status, 1);
        self.record_value(JOB_DURATION_MS, result.elapsed.as_secs_f64() * 1000.0);
    }

    /// All metrics as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let inner = self.inner.lock();
        let mut metrics = serde_json::Map::new();
        for (name, count) in &inner.counters {
            metrics.insert(name.clone(), json!(count));
        }
        for (name, histogram) in &inner.histograms {
            metrics.insert(name.clone(), histogram.value());
        }
        Value::Object(metrics)
    }

    /// Emit one `info` event per counter.
    pub fn log_summary(&self) {
        let inner = self.inner.lock();
        for (name, count) in &inner.counters {
            info!(metric = %name, value = count, "job metric");
        }
    }

    /// Save all metrics to a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }
}

/// Tracks a value distribution.
#[derive(Debug, Clone, Default)]
pub struct HistogramMetric {
    values: Vec<f64>,
}

impl HistogramMetric {
    /// Record a value in the histogram.
    pub fn record(&mut self, value: f64) {
        self.values.push(value);
    }

    /// Get statistics from the histogram.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> HistogramStats {
        if self.values.is_empty() {
            return HistogramStats::default();
        }

        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();
        HistogramStats {
            count,
            sum,
            mean: sum / count as f64,
            min: sorted[0],
            max: sorted[count - 1],
            p50: sorted[count / 2],
            p95: sorted[(count * 95) / 100],
        }
    }

    fn value(&self) -> Value {
        let stats = self.stats();
        json!({
            "count": stats.count,
            "sum": stats.sum,
            "mean": stats.mean,
            "min": stats.min,
            "max": stats.max,
            "p50": stats.p50,
            "p95": stats.p95,
        })
    }
}

/// Statistics computed from a histogram.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
}
