//! Tests for the per-partition chunk pipeline.

use chunkbeam::testing::*;
use chunkbeam::*;
use std::sync::Arc;

fn pipeline_over(
    customers: Vec<Customer>,
    writer: Arc<dyn ChunkWriter<Customer>>,
    chunk_size: usize,
) -> ChunkPipeline<Customer, Customer> {
    ChunkPipeline::new(
        Arc::new(VecSource::new(customers)),
        Arc::new(CustomerProcessor),
        writer,
        chunk_size,
    )
    .with_skip_policy(Arc::new(default_policy()))
}

#[test]
fn flushes_full_chunks_then_remainder() {
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let pipeline = pipeline_over(sample_customers(1200), store.clone(), 500);

    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 1200));

    assert_eq!(result.status, BatchStatus::Completed);
    assert_eq!(result.failure, None);
    assert_eq!(store.chunk_sizes(), vec![500, 500, 200]);
    assert_eq!(
        result.counts,
        PartitionCounts {
            read: 1200,
            written: 1200,
            skipped: 0,
            commits: 3,
        }
    );
}

#[test]
fn flush_count_is_ceil_of_length_over_chunk_size() {
    for (len, chunk) in [(0, 3), (1, 3), (3, 3), (4, 3), (10, 1), (7, 100)] {
        let store = Arc::new(InMemoryStore::<Customer>::new());
        let pipeline = pipeline_over(sample_customers(len), store.clone(), chunk);
        let result = pipeline.run(&PartitionDescriptor::new(0, 1, 1000));

        let sizes = store.chunk_sizes();
        assert_eq!(sizes.len(), len.div_ceil(chunk), "len={len} chunk={chunk}");
        if let Some(&last) = sizes.last() {
            let expected = if len % chunk == 0 { chunk } else { len % chunk };
            assert_eq!(last, expected);
        }
        assert_eq!(result.counts.commits as usize, sizes.len());
    }
}

#[test]
fn reads_only_its_range_in_ascending_order() {
    let mut customers = sample_customers(100);
    customers.reverse();
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let pipeline = pipeline_over(customers, store.clone(), 7);

    let result = pipeline.run(&PartitionDescriptor::new(1, 41, 60));

    assert!(result.is_completed());
    let ids: Vec<i64> = store.records().iter().map(|c| c.id).collect();
    assert_eq!(ids, (41..=60).collect::<Vec<_>>());
}

#[test]
fn skips_allow_listed_errors_and_continues() {
    let mut customers = sample_customers(10);
    customers[2] = customer_with_bad_contact(3);
    customers[6] = customer_with_bad_dob(7);
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let pipeline = pipeline_over(customers, store.clone(), 4);

    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 10));

    assert!(result.is_completed());
    assert_eq!(result.skip_count(), 2);
    assert_eq!(result.counts.read, 10);
    assert_eq!(result.counts.written, 8);
    let ids: Vec<i64> = store.records().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 4, 5, 6, 8, 9, 10]);
    // skips do not count toward chunk fill
    assert_eq!(store.chunk_sizes(), vec![4, 4]);
}

#[test]
fn fatal_error_drops_unflushed_chunk() {
    let mut customers = sample_customers(10);
    customers[6] = customer_with_bad_email(7);
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let pipeline = pipeline_over(customers, store.clone(), 4);

    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 10));

    assert_eq!(result.status, BatchStatus::Failed);
    // 1..=4 were committed; 5 and 6 sat in the buffer and were discarded
    let ids: Vec<i64> = store.records().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(result.counts.written, 4);
    assert_eq!(result.counts.read, 7);
    match result.failure {
        Some(PartitionFailure::Transform { key, error }) => {
            assert_eq!(key, 7);
            assert_eq!(error.category, ErrorCategory::Validation);
        }
        other => panic!("expected transform failure, got {other:?}"),
    }
}

#[test]
fn skip_ceiling_fails_the_partition() {
    let customers: Vec<Customer> = (1..=6).map(customer_with_bad_contact).collect();
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let pipeline = pipeline_over(customers, store.clone(), 2)
        .with_skip_policy(Arc::new(default_policy().with_limit(3)));

    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 6));

    assert_eq!(result.status, BatchStatus::Failed);
    assert_eq!(result.skip_count(), 3);
    assert!(matches!(result.failure, Some(PartitionFailure::Transform { key: 4, .. })));
    assert!(store.is_empty());
}

#[test]
fn never_skip_is_the_pipeline_default() {
    let mut customers = sample_customers(3);
    customers[1] = customer_with_bad_dob(2);
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let pipeline = ChunkPipeline::<Customer, Customer>::new(
        Arc::new(VecSource::new(customers)),
        Arc::new(CustomerProcessor),
        store.clone(),
        10,
    );

    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 3));
    assert_eq!(result.status, BatchStatus::Failed);
    assert!(store.is_empty());
}

#[test]
fn read_error_aborts_immediately() {
    let source = FlakySource::new(sample_customers(10)).fail_at_key(6);
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let pipeline =
        ChunkPipeline::<Customer, Customer>::new(Arc::new(source), Arc::new(CustomerProcessor), store.clone(), 2);

    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 10));

    assert_eq!(result.status, BatchStatus::Failed);
    assert!(matches!(result.failure, Some(PartitionFailure::Read(_))));
    assert_eq!(store.records().len(), 4);
    assert_eq!(result.counts.read, 5);
}

#[test]
fn write_error_rolls_back_chunk_and_aborts() {
    let writer = Arc::new(FlakyWriter::<Customer>::new().fail_on_call(2));
    let pipeline = pipeline_over(sample_customers(10), writer.clone(), 3);

    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 10));

    assert_eq!(result.status, BatchStatus::Failed);
    match &result.failure {
        Some(PartitionFailure::Write(e)) => assert_eq!(e.records, 3),
        other => panic!("expected write failure, got {other:?}"),
    }
    assert_eq!(writer.store().chunk_sizes(), vec![3]);
    assert_eq!(writer.calls(), 2);
    assert_eq!(result.counts.written, 3);
}

#[test]
fn every_read_record_is_written_or_skipped_once() {
    let mut customers = sample_customers(50);
    for i in [4, 9, 23, 41] {
        customers[i] = customer_with_bad_contact(i as i64 + 1);
    }
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let pipeline = pipeline_over(customers, store.clone(), 8);

    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 50));

    assert!(result.is_completed());
    assert_eq!(result.counts.read, result.counts.written + result.counts.skipped);
    let mut ids: Vec<i64> = store.records().iter().map(|c| c.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 46);
    assert!(![5, 10, 24, 42].iter().any(|id| ids.contains(id)));
}

#[test]
fn zero_chunk_size_is_clamped() {
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let pipeline = pipeline_over(sample_customers(3), store.clone(), 0);
    assert_eq!(pipeline.chunk_size(), 1);
    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 3));
    assert_eq!(store.chunk_sizes(), vec![1, 1, 1]);
    assert!(result.is_completed());
}

#[test]
fn closures_can_transform() {
    let source = Arc::new(VecSource::new((1..=9_i64).collect()));
    let store = Arc::new(InMemoryStore::<String>::new());
    let pipeline = ChunkPipeline::<i64, String>::new(
        source,
        Arc::new(|n: &i64| -> Result<String, TransformError> {
            if n % 3 == 0 {
                Err(TransformError::malformed("n", "multiple of three"))
            } else {
                Ok(format!("#{n}"))
            }
        }),
        store.clone(),
        10,
    )
    .with_skip_policy(Arc::new(default_policy()));

    let result = pipeline.run(&PartitionDescriptor::new(0, 1, 9));
    assert_eq!(result.skip_count(), 3);
    assert_eq!(store.records(), vec!["#1", "#2", "#4", "#5", "#7", "#8"]);
}
