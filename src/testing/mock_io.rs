//! Mock I/O helpers for testing with temporary files.

use crate::io::csv::write_csv_vec;
use crate::record::Customer;
use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

/// A temporary file that is automatically deleted when dropped.
pub struct TempFilePath {
    #[allow(dead_code)]
    temp_file: NamedTempFile,
    path: PathBuf,
}

impl TempFilePath {
    /// Create a new temporary file with a specific extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created.
    pub fn with_extension(extension: &str) -> std::io::Result<Self> {
        let temp_file = tempfile::Builder::new()
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        let path = temp_file.path().to_path_buf();
        Ok(Self { temp_file, path })
    }

    /// Get the path to the temporary file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A temporary directory that is automatically deleted when dropped.
pub struct TempDirPath {
    #[allow(dead_code)]
    temp_dir: TempDir,
    path: PathBuf,
}

impl TempDirPath {
    /// Create a new temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        Ok(Self { temp_dir, path })
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a file path within this directory.
    #[must_use]
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }
}

/// Write `customers` to a temporary CSV file with the standard header line,
/// in the given order.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or written.
///
/// # Example
///
/// ```
/// use chunkbeam::testing::{mock_customers_csv, sample_customers};
///
/// let file = mock_customers_csv(&sample_customers(3)).unwrap();
/// let text = std::fs::read_to_string(file.path()).unwrap();
/// assert!(text.starts_with("id,firstName,lastName,email,gender,contactNo,country,dob"));
/// ```
pub fn mock_customers_csv(customers: &[Customer]) -> Result<TempFilePath> {
    let temp = TempFilePath::with_extension("csv")?;
    write_csv_vec(temp.path(), true, customers)?;
    Ok(temp)
}

/// Write raw text to a temporary CSV file, for inputs no serializer would
/// produce (bad ids, short rows, other delimiters).
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or written.
pub fn mock_csv_text(contents: &str) -> Result<TempFilePath> {
    let temp = TempFilePath::with_extension("csv")?;
    let mut file = std::fs::File::create(temp.path())?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(temp)
}
