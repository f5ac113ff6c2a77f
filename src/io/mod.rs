//! Input collaborators.
//!
//! A [`RecordSource`] reports the key bounds of its data and opens cursors
//! restricted to one key range. Cursors yield records in ascending key order;
//! `None` means the range is exhausted, `Some(Err(_))` is a read failure.

use crate::error::ReadError;
use crate::partition::KeyRange;

pub mod memory;

#[cfg_attr(docsrs, doc(cfg(feature = "io-csv")))]
#[cfg(feature = "io-csv")]
pub mod csv;

/// A cursor over one partition's records.
pub type RecordCursor<'a, T> = Box<dyn Iterator<Item = Result<T, ReadError>> + Send + 'a>;

/// Something that knows the smallest and largest key in its data.
pub trait KeyDomain: Send + Sync {
    /// `Ok(None)` when there is no data at all.
    ///
    /// # Errors
    /// Returns [`ReadError`] if the bounds cannot be determined.
    fn key_bounds(&self) -> Result<Option<KeyRange>, ReadError>;
}

/// A keyed record source that can be read one range at a time.
///
/// Must be safe to open concurrently from several partition workers.
pub trait RecordSource<T>: KeyDomain {
    /// Open a cursor over the records whose key falls in `range`.
    ///
    /// # Errors
    /// Returns [`ReadError`] if the underlying input cannot be opened.
    fn open(&self, range: KeyRange) -> Result<RecordCursor<'_, T>, ReadError>;
}
