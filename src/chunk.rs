//! The per-partition read → process → write pipeline.
//!
//! [`ChunkPipeline`] reads its partition's key range in ascending order,
//! transforms each record, and commits the results in chunks of
//! `chunk_size` records. Each chunk is handed to the
//! [`ChunkWriter`](crate::store::ChunkWriter) as one atomic unit.
//!
//! Failure handling:
//! - a transform error goes to the [`SkipPolicy`]; `Skip` counts the record
//!   and moves on, `Fail` aborts the partition
//! - read and write errors always abort the partition
//! - on abort the unflushed chunk is dropped, never written
//!
//! A record is therefore either written once, skipped once, or (after an
//! abort) not processed at all.

use crate::error::{PartitionFailure, WriteError};
use crate::io::RecordSource;
use crate::partition::PartitionDescriptor;
use crate::processor::ItemProcessor;
use crate::record::Keyed;
use crate::result::{PartitionCounts, PartitionResult};
use crate::skip::{NeverSkip, NoopSkipListener, SkipDecision, SkipListener, SkipPolicy};
use crate::store::ChunkWriter;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs one partition to completion or failure.
pub trait Pipeline: Send + Sync {
    /// Never panics on data or I/O problems; those end up in the result.
    fn run(&self, descriptor: &PartitionDescriptor) -> PartitionResult;
}

/// Chunk-oriented [`Pipeline`] over injected source, processor and writer.
pub struct ChunkPipeline<I, O> {
    source: Arc<dyn RecordSource<I>>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ChunkWriter<O>>,
    skip_policy: Arc<dyn SkipPolicy>,
    listener: Arc<dyn SkipListener<I>>,
    chunk_size: usize,
}

impl<I, O> ChunkPipeline<I, O> {
    /// A pipeline that skips nothing. `chunk_size` is clamped to at least 1.
    pub fn new(
        source: Arc<dyn RecordSource<I>>,
        processor: Arc<dyn ItemProcessor<I, O>>,
        writer: Arc<dyn ChunkWriter<O>>,
        chunk_size: usize,
    ) -> Self {
        Self {
            source,
            processor,
            writer,
            skip_policy: Arc::new(NeverSkip),
            listener: Arc::new(NoopSkipListener),
            chunk_size: chunk_size.max(1),
        }
    }

    #[must_use]
    pub fn with_skip_policy(mut self, policy: Arc<dyn SkipPolicy>) -> Self {
        self.skip_policy = policy;
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn SkipListener<I>>) -> Self {
        self.listener = listener;
        self
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn flush(
        &self,
        descriptor: &PartitionDescriptor,
        chunk: &mut Vec<O>,
        counts: &mut PartitionCounts,
    ) -> Result<(), WriteError> {
        self.writer.write_chunk(chunk)?;
        counts.written += chunk.len() as u64;
        counts.commits += 1;
        debug!(
            partition = %descriptor.name,
            size = chunk.len(),
            commit = counts.commits,
            "chunk committed"
        );
        chunk.clear();
        Ok(())
    }
}

impl<I: Keyed, O> ChunkPipeline<I, O> {
    fn drive(
        &self,
        descriptor: &PartitionDescriptor,
        counts: &mut PartitionCounts,
    ) -> Result<(), PartitionFailure> {
        let cursor = self.source.open(descriptor.range())?;
        let mut chunk: Vec<O> = Vec::with_capacity(self.chunk_size);

        for next in cursor {
            let item = next?;
            counts.read += 1;
            match self.processor.process(&item) {
                Ok(out) => {
                    chunk.push(out);
                    if chunk.len() >= self.chunk_size {
                        self.flush(descriptor, &mut chunk, counts)?;
                    }
                }
                Err(e) => {
                    let outcome = self.skip_policy.decide(e, counts.skipped);
                    if outcome.decision == SkipDecision::Fail {
                        if !chunk.is_empty() {
                            debug!(
                                partition = %descriptor.name,
                                discarded = chunk.len(),
                                "dropping unflushed chunk"
                            );
                        }
                        return Err(PartitionFailure::Transform {
                            key: item.key(),
                            error: outcome.error,
                        });
                    }
                    counts.skipped += 1;
                    self.listener.on_skip(&descriptor.name, &item, &outcome.error);
                }
            }
        }

        if !chunk.is_empty() {
            self.flush(descriptor, &mut chunk, counts)?;
        }
        Ok(())
    }
}

impl<I: Keyed, O> Pipeline for ChunkPipeline<I, O> {
    fn run(&self, descriptor: &PartitionDescriptor) -> PartitionResult {
        let started = Instant::now();
        let mut counts = PartitionCounts::default();
        info!(
            partition = %descriptor.name,
            range = %descriptor.range(),
            "partition started"
        );

        match self.drive(descriptor, &mut counts) {
            Ok(()) => {
                info!(
                    partition = %descriptor.name,
                    read = counts.read,
                    written = counts.written,
                    skipped = counts.skipped,
                    commits = counts.commits,
                    "partition completed"
                );
                PartitionResult::completed(descriptor.clone(), counts, started.elapsed())
            }
            Err(failure) => {
                error!(
                    partition = %descriptor.name,
                    read = counts.read,
                    written = counts.written,
                    %failure,
                    "partition failed"
                );
                PartitionResult::failed(descriptor.clone(), counts, failure, started.elapsed())
            }
        }
    }
}
