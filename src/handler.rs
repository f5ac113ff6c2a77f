//! Fan-out of partitions onto a bounded worker pool, and the join barrier.
//!
//! [`WorkerPool`] is a fixed-size rayon pool fronted by an admission gate.
//! At most `size + queue_capacity` partitions are admitted at once (`size`
//! running, the rest queued); [`PartitionHandler::execute`] blocks the
//! submitting thread while the gate is full. Submission never drops work.
//!
//! Partitions fail independently. A fatal failure in one partition does not
//! cancel its siblings: every admitted partition runs to its own completion
//! or failure, and the failure only shows up in the aggregated
//! [`JobResult`].

use crate::chunk::Pipeline;
use crate::error::{ConfigError, PartitionFailure};
use crate::partition::PartitionDescriptor;
use crate::result::{JobResult, PartitionCounts, PartitionResult};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Counts admitted-but-unfinished tasks and blocks admission at capacity.
struct AdmissionGate {
    in_flight: Mutex<usize>,
    freed: Condvar,
    capacity: usize,
}

impl AdmissionGate {
    fn new(capacity: usize) -> Self {
        Self {
            in_flight: Mutex::new(0),
            freed: Condvar::new(),
            capacity,
        }
    }

    fn acquire(self: &Arc<Self>) -> Permit {
        let mut in_flight = self.in_flight.lock();
        while *in_flight >= self.capacity {
            self.freed.wait(&mut in_flight);
        }
        *in_flight += 1;
        Permit {
            gate: Arc::clone(self),
        }
    }

    fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }
}

/// Releases one admission slot on drop, including during unwinding.
struct Permit {
    gate: Arc<AdmissionGate>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        *self.gate.in_flight.lock() -= 1;
        self.gate.freed.notify_one();
    }
}

/// Fixed-size worker pool with a bounded submission queue.
///
/// This is the only shared mutable state of a job; it is touched only by
/// submitting work and waiting for it.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    gate: Arc<AdmissionGate>,
    size: usize,
    queue_capacity: usize,
}

impl WorkerPool {
    /// # Errors
    /// [`ConfigError`] if `size` is zero or the threads cannot be spawned.
    pub fn new(size: usize, queue_capacity: usize) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::MustBePositive {
                field: "worker_pool_size",
                value: size,
            });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("partition-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::WorkerPool(e.to_string()))?;
        Ok(Self {
            pool,
            gate: Arc::new(AdmissionGate::new(size + queue_capacity)),
            size,
            queue_capacity,
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Tasks currently running or queued.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    /// Run every task on the pool and return their outputs in task order.
    ///
    /// Blocks the caller while the pool and its queue are full, and returns
    /// only after every task has finished. A panicking task yields `Err`
    /// with the panic message; the other tasks are unaffected.
    pub fn run_all<T, R, F>(&self, tasks: Vec<T>, f: F) -> Vec<Result<R, String>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let slots: Vec<Mutex<Option<Result<R, String>>>> =
            (0..tasks.len()).map(|_| Mutex::new(None)).collect();

        self.pool.in_place_scope(|scope| {
            for (i, task) in tasks.into_iter().enumerate() {
                let permit = self.gate.acquire();
                let (f, slot) = (&f, &slots[i]);
                scope.spawn(move |_| {
                    let _permit = permit;
                    let out = catch_unwind(AssertUnwindSafe(|| f(task))).map_err(panic_message);
                    *slot.lock() = Some(out);
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| {
                slot.into_inner()
                    .unwrap_or_else(|| Err("task produced no result".to_string()))
            })
            .collect()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Dispatches one pipeline run per partition and aggregates the outcomes.
pub struct PartitionHandler {
    pool: WorkerPool,
}

impl PartitionHandler {
    #[must_use]
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Run `pipeline` once per descriptor and wait for all of them.
    ///
    /// The returned result is FAILED if any partition failed; its skip count
    /// is the sum over partitions.
    pub fn execute(&self, descriptors: Vec<PartitionDescriptor>, pipeline: Arc<dyn Pipeline>) -> JobResult {
        debug!(
            partitions = descriptors.len(),
            workers = self.pool.size(),
            queue = self.pool.queue_capacity(),
            "dispatching partitions"
        );
        let started = Instant::now();
        let outputs = self.pool.run_all(descriptors.clone(), |d| pipeline.run(&d));

        let results = descriptors
            .into_iter()
            .zip(outputs)
            .map(|(descriptor, out)| {
                out.unwrap_or_else(|msg| {
                    error!(partition = %descriptor.name, panic = %msg, "partition worker panicked");
                    PartitionResult::failed(
                        descriptor,
                        PartitionCounts::default(),
                        PartitionFailure::Panicked(msg),
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        let mut result = JobResult::from_partitions(results);
        result.elapsed = started.elapsed();
        result
    }
}
