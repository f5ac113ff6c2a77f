//! Collaborators that fail on cue, for exercising failure paths.

use crate::chunk::Pipeline;
use crate::error::{PartitionFailure, ReadError, WriteError};
use crate::io::memory::VecSource;
use crate::io::{KeyDomain, RecordCursor, RecordSource};
use crate::partition::{KeyRange, PartitionDescriptor};
use crate::record::Keyed;
use crate::result::{PartitionCounts, PartitionResult};
use crate::store::ChunkWriter;
use crate::store::memory::InMemoryStore;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::thread;
use std::time::{Duration, Instant};

/// A [`VecSource`] that can fail to report its bounds, or fail to read one
/// particular record.
#[derive(Debug, Clone)]
pub struct FlakySource<T> {
    inner: VecSource<T>,
    fail_at_key: Option<i64>,
    fail_bounds: bool,
}

impl<T: Keyed> FlakySource<T> {
    #[must_use]
    pub fn new(records: Vec<T>) -> Self {
        Self {
            inner: VecSource::new(records),
            fail_at_key: None,
            fail_bounds: false,
        }
    }

    /// Yield a [`ReadError`] in place of the record with key `key`.
    #[must_use]
    pub fn fail_at_key(mut self, key: i64) -> Self {
        self.fail_at_key = Some(key);
        self
    }

    /// Make [`KeyDomain::key_bounds`] fail.
    #[must_use]
    pub fn fail_bounds(mut self) -> Self {
        self.fail_bounds = true;
        self
    }
}

impl<T: Keyed + Send + Sync> KeyDomain for FlakySource<T> {
    fn key_bounds(&self) -> Result<Option<KeyRange>, ReadError> {
        if self.fail_bounds {
            return Err(ReadError::new("injected failure: bounds unavailable"));
        }
        self.inner.key_bounds()
    }
}

impl<T: Keyed + Clone + Send + Sync> RecordSource<T> for FlakySource<T> {
    fn open(&self, range: KeyRange) -> Result<RecordCursor<'_, T>, ReadError> {
        let fail_at = self.fail_at_key;
        Ok(Box::new(self.inner.slice(range).iter().map(move |r| {
            if fail_at == Some(r.key()) {
                Err(ReadError::new(format!("injected failure reading record {}", r.key())))
            } else {
                Ok(r.clone())
            }
        })))
    }
}

/// An [`InMemoryStore`] that rejects some chunks.
///
/// A rejected chunk is not stored at all, mirroring a rolled-back
/// transaction.
#[derive(Debug)]
pub struct FlakyWriter<T> {
    inner: InMemoryStore<T>,
    fail_on_call: Option<usize>,
    fail_on_key: Option<i64>,
    calls: Mutex<usize>,
}

impl<T: Clone> FlakyWriter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_on_call: None,
            fail_on_key: None,
            calls: Mutex::new(0),
        }
    }

    /// Reject the `n`-th call to `write_chunk` (1-based, counted across all
    /// partitions).
    #[must_use]
    pub fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// Reject any chunk containing a record with key `key`.
    #[must_use]
    pub fn fail_on_key(mut self, key: i64) -> Self {
        self.fail_on_key = Some(key);
        self
    }

    /// Chunks that were accepted.
    #[must_use]
    pub fn store(&self) -> &InMemoryStore<T> {
        &self.inner
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl<T: Clone> Default for FlakyWriter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed + Clone + Send + Sync> ChunkWriter<T> for FlakyWriter<T> {
    fn write_chunk(&self, chunk: &[T]) -> Result<(), WriteError> {
        let call = {
            let mut calls = self.calls.lock();
            *calls += 1;
            *calls
        };
        if self.fail_on_call == Some(call) {
            return Err(WriteError::new(chunk.len(), format!("injected failure on write #{call}")));
        }
        if let Some(key) = self.fail_on_key
            && chunk.iter().any(|r| r.key() == key)
        {
            return Err(WriteError::new(chunk.len(), format!("injected failure on key {key}")));
        }
        self.inner.write_chunk(chunk)
    }
}

#[derive(Debug, Default)]
struct GateState {
    running: usize,
    peak: usize,
    started: Vec<usize>,
}

/// A [`Pipeline`] that does no I/O: each partition holds its worker for a
/// fixed time and then completes, fails or panics as scripted.
///
/// Records how many partitions ran at once and in which order they started.
#[derive(Debug, Default)]
pub struct GatedPipeline {
    hold: Duration,
    fail: BTreeSet<usize>,
    panic: BTreeSet<usize>,
    state: Mutex<GateState>,
}

impl GatedPipeline {
    #[must_use]
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            ..Self::default()
        }
    }

    /// Partition `index` ends in FAILED with a read error.
    #[must_use]
    pub fn failing(mut self, index: usize) -> Self {
        self.fail.insert(index);
        self
    }

    /// Partition `index` panics.
    #[must_use]
    pub fn panicking(mut self, index: usize) -> Self {
        self.panic.insert(index);
        self
    }

    /// Most partitions observed running at the same time.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.state.lock().peak
    }

    /// Partition indices in the order their runs began.
    #[must_use]
    pub fn started(&self) -> Vec<usize> {
        self.state.lock().started.clone()
    }
}

impl Pipeline for GatedPipeline {
    #[allow(clippy::cast_possible_truncation)]
    fn run(&self, descriptor: &PartitionDescriptor) -> PartitionResult {
        let begun = Instant::now();
        {
            let mut state = self.state.lock();
            state.running += 1;
            state.peak = state.peak.max(state.running);
            state.started.push(descriptor.index);
        }
        thread::sleep(self.hold);
        self.state.lock().running -= 1;

        if self.panic.contains(&descriptor.index) {
            panic!("injected panic in {}", descriptor.name);
        }
        let keys = descriptor.range().width() as u64;
        if self.fail.contains(&descriptor.index) {
            let failure =
                PartitionFailure::Read(ReadError::new(format!("injected failure in {}", descriptor.name)));
            return PartitionResult::failed(
                descriptor.clone(),
                PartitionCounts::default(),
                failure,
                begun.elapsed(),
            );
        }
        let counts = PartitionCounts {
            read: keys,
            written: keys,
            skipped: 0,
            commits: 1,
        };
        PartitionResult::completed(descriptor.clone(), counts, begun.elapsed())
    }
}
