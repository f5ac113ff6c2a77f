//! In-memory record source.

use crate::error::ReadError;
use crate::io::{KeyDomain, RecordCursor, RecordSource};
use crate::partition::KeyRange;
use crate::record::Keyed;

/// A source backed by a `Vec`, kept sorted by key.
///
/// Records with equal keys keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct VecSource<T> {
    records: Vec<T>,
}

impl<T: Keyed> VecSource<T> {
    #[must_use]
    pub fn new(mut records: Vec<T>) -> Self {
        records.sort_by_key(|r| r.key());
        Self { records }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose key lies in `range`, as a contiguous slice.
    #[must_use]
    pub fn slice(&self, range: KeyRange) -> &[T] {
        let start = self.records.partition_point(|r| r.key() < range.min);
        let end = self.records.partition_point(|r| r.key() <= range.max);
        &self.records[start..end.max(start)]
    }
}

impl<T: Keyed + Send + Sync> KeyDomain for VecSource<T> {
    fn key_bounds(&self) -> Result<Option<KeyRange>, ReadError> {
        Ok(match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => Some(KeyRange::new(first.key(), last.key())),
            _ => None,
        })
    }
}

impl<T: Keyed + Clone + Send + Sync> RecordSource<T> for VecSource<T> {
    fn open(&self, range: KeyRange) -> Result<RecordCursor<'_, T>, ReadError> {
        Ok(Box::new(self.slice(range).iter().cloned().map(Ok)))
    }
}
