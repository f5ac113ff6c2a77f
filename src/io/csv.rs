//! Delimited-file input for customer records.
//!
//! This module provides:
//! - **Range-scoped reading**: [`CsvCustomerSource`] implements
//!   [`RecordSource<Customer>`] over a delimited file
//! - **Lenient row mapping**: [`customer_from_record`]
//! - **Typed writing** with Serde: [`write_csv_vec`]
//!
//! # Design notes
//! - Tokenizing is non-strict: missing trailing columns become empty strings
//!   and extra columns are ignored.
//! - Only `id` is parsed at read time. A row whose `id` is not an integer
//!   cannot be routed to a partition and surfaces as a [`ReadError`].
//! - Cursors yield ascending keys. When the last scan saw the file in key
//!   order, a cursor streams and stops at the end of its range; otherwise it
//!   buffers its range and sorts it (stable, so duplicates keep file order).
//!   A cursor opened before any scan runs one first.

use crate::error::ReadError;
use crate::io::{KeyDomain, RecordCursor, RecordSource};
use crate::partition::KeyRange;
use crate::record::Customer;
use anyhow::{Context, Result};
use csv::{StringRecord, WriterBuilder};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, create_dir_all};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tokenizer options for [`CsvCustomerSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// Skip the first line.
    pub has_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
        }
    }
}

/// Result of a full pass over the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// `None` for a file with no data rows.
    pub bounds: Option<KeyRange>,
    pub rows: u64,
    /// Whether keys were non-decreasing in file order.
    pub sorted: bool,
}

/// Customer records read from a delimited file.
pub struct CsvCustomerSource {
    path: PathBuf,
    options: CsvOptions,
    last_scan: Mutex<Option<ScanSummary>>,
}

impl CsvCustomerSource {
    pub fn new(path: impl AsRef<Path>, options: CsvOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
            last_scan: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file once, recording key bounds and ordering.
    ///
    /// # Errors
    /// Returns [`ReadError`] if the file cannot be opened or a row is unreadable.
    pub fn scan(&self) -> Result<ScanSummary, ReadError> {
        let mut summary = ScanSummary {
            bounds: None,
            rows: 0,
            sorted: true,
        };
        let mut prev: Option<i64> = None;
        for row in self.rows()? {
            let id = row?.id;
            summary.rows += 1;
            if prev.is_some_and(|p| id < p) {
                summary.sorted = false;
            }
            prev = Some(id);
            summary.bounds = Some(match summary.bounds {
                None => KeyRange::new(id, id),
                Some(b) => KeyRange::new(b.min.min(id), b.max.max(id)),
            });
        }
        debug!(
            path = %self.path.display(),
            rows = summary.rows,
            sorted = summary.sorted,
            "scanned input"
        );
        *self.last_scan.lock() = Some(summary);
        Ok(summary)
    }

    /// Summary of the most recent [`scan`](Self::scan), if any.
    #[must_use]
    pub fn last_scan(&self) -> Option<ScanSummary> {
        *self.last_scan.lock()
    }

    /// Whether the file is in key order, scanning it if that is not known yet.
    fn is_sorted(&self) -> Result<bool, ReadError> {
        match self.last_scan() {
            Some(summary) => Ok(summary.sorted),
            None => Ok(self.scan()?.sorted),
        }
    }

    /// All rows in file order.
    fn rows(&self) -> Result<impl Iterator<Item = Result<Customer, ReadError>> + Send + 'static> {
        let f = File::open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
        let rdr = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(self.options.has_headers)
            .flexible(true)
            .from_reader(BufReader::new(f));
        let path = self.path.clone();
        Ok(rdr
            .into_records()
            .enumerate()
            .map(move |(i, rec)| parse_row(rec, i + 1, &path).map_err(ReadError::from)))
    }
}

fn parse_row(rec: csv::Result<StringRecord>, row: usize, path: &Path) -> Result<Customer> {
    let rec = rec.with_context(|| format!("read CSV record #{row} in {}", path.display()))?;
    customer_from_record(&rec).with_context(|| format!("CSV record #{row} in {}", path.display()))
}

/// Map one tokenized row onto a [`Customer`], by column position.
///
/// # Errors
/// Returns an error if the `id` column is missing or not an integer.
pub fn customer_from_record(rec: &StringRecord) -> Result<Customer> {
    let field = |i: usize| rec.get(i).unwrap_or_default().to_string();
    let raw_id = rec.get(0).unwrap_or_default().trim();
    let id = raw_id
        .parse::<i64>()
        .with_context(|| format!("`id` is not an integer: {raw_id:?}"))?;
    Ok(Customer {
        id,
        first_name: field(1),
        last_name: field(2),
        email: field(3),
        gender: field(4),
        contact_no: field(5),
        country: field(6),
        dob: field(7),
    })
}

impl KeyDomain for CsvCustomerSource {
    fn key_bounds(&self) -> Result<Option<KeyRange>, ReadError> {
        Ok(self.scan()?.bounds)
    }
}

impl RecordSource<Customer> for CsvCustomerSource {
    fn open(&self, range: KeyRange) -> Result<RecordCursor<'_, Customer>, ReadError> {
        let sorted = self.is_sorted()?;
        let rows = self.rows()?;
        if sorted {
            let cursor = rows
                .take_while(move |r| !matches!(r, Ok(c) if c.id > range.max))
                .filter(move |r| !matches!(r, Ok(c) if c.id < range.min));
            return Ok(Box::new(cursor));
        }
        let mut buffered = rows
            .filter(|r| !matches!(r, Ok(c) if !range.contains(c.id)))
            .collect::<Result<Vec<_>, _>>()?;
        buffered.sort_by_key(|c| c.id);
        Ok(Box::new(buffered.into_iter().map(Ok)))
    }
}

/// Write a typed slice to a CSV file.
///
/// Rows are serialized with Serde using `T: Serialize`; creates parent
/// directories if they don't exist.
///
/// # Returns
/// The number of rows written (i.e., `data.len()`).
///
/// # Errors
/// Returns an error if the file/dirs cannot be created or any row fails to
/// serialize/flush.
pub fn write_csv_vec<T: Serialize>(
    path: impl AsRef<Path>,
    has_headers: bool,
    data: &[T],
) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut wtr = WriterBuilder::new().has_headers(has_headers).from_writer(f);
    for (i, row) in data.iter().enumerate() {
        wtr.serialize(row)
            .with_context(|| format!("serialize CSV row #{}", i + 1))?;
    }
    wtr.flush()?;
    Ok(data.len())
}
