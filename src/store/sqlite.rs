//! `SQLite`-backed customer store and job repository.
//!
//! Both use a single `Mutex<Connection>`; they may point at the same
//! database file.

use crate::error::{StoreError, WriteError};
use crate::record::Customer;
use crate::result::{JobResult, PartitionResult};
use crate::store::{ChunkWriter, ExecutionId, JobRepository};
use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// `SQLite` datetime format (UTC, no timezone suffix).
const SQLITE_DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const CREATE_CUSTOMERS: &str = r"
CREATE TABLE IF NOT EXISTS customers_info (
    id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    gender TEXT NOT NULL,
    contact_no TEXT NOT NULL,
    country TEXT NOT NULL,
    dob TEXT NOT NULL
);
";

// Re-running the job rewrites rows it already wrote.
const UPSERT_CUSTOMER: &str = r"
INSERT INTO customers_info (id, first_name, last_name, email, gender, contact_no, country, dob)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
ON CONFLICT(id) DO UPDATE SET
    first_name = excluded.first_name,
    last_name = excluded.last_name,
    email = excluded.email,
    gender = excluded.gender,
    contact_no = excluded.contact_no,
    country = excluded.country,
    dob = excluded.dob
";

const CREATE_JOB_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS job_executions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_name TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    skip_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS partition_executions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    execution_id INTEGER NOT NULL REFERENCES job_executions(id),
    partition_name TEXT NOT NULL,
    min_key INTEGER NOT NULL,
    max_key INTEGER NOT NULL,
    status TEXT NOT NULL,
    read_count INTEGER NOT NULL,
    write_count INTEGER NOT NULL,
    skip_count INTEGER NOT NULL,
    commit_count INTEGER NOT NULL,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_partition_execution ON partition_executions (execution_id);
";

fn open_with(path: &Path, ddl: &str) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(ddl)?;
    Ok(conn)
}

fn in_memory_with(ddl: &str) -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(ddl)?;
    Ok(conn)
}

fn now_sqlite() -> String {
    Utc::now().format(SQLITE_DATETIME_FMT).to_string()
}

/// Customer table with one transaction per chunk.
pub struct SqliteCustomerStore {
    conn: Mutex<Connection>,
}

impl SqliteCustomerStore {
    /// Open or create the customer table in the database at `path`.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the directory or database can't be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_with(path, CREATE_CUSTOMERS)?),
        })
    }

    /// # Errors
    /// Returns [`StoreError`] if the database can't be initialized.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(in_memory_with(CREATE_CUSTOMERS)?),
        })
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// # Errors
    /// Returns [`StoreError`] on query failure.
    #[allow(clippy::cast_sign_loss)]
    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .lock_conn()
            .query_row("SELECT COUNT(*) FROM customers_info", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// # Errors
    /// Returns [`StoreError`] on query failure.
    pub fn get(&self, id: i64) -> Result<Option<Customer>, StoreError> {
        let conn = self.lock_conn();
        let found = conn
            .query_row(
                "SELECT id, first_name, last_name, email, gender, contact_no, country, dob \
                 FROM customers_info WHERE id = ?1",
                [id],
                row_to_customer,
            )
            .optional()?;
        Ok(found)
    }

    /// All customers ordered by id.
    ///
    /// # Errors
    /// Returns [`StoreError`] on query failure.
    pub fn all(&self) -> Result<Vec<Customer>, StoreError> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT id, first_name, last_name, email, gender, contact_no, country, dob \
             FROM customers_info ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_customer)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn row_to_customer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        gender: row.get(4)?,
        contact_no: row.get(5)?,
        country: row.get(6)?,
        dob: row.get(7)?,
    })
}

impl ChunkWriter<Customer> for SqliteCustomerStore {
    fn write_chunk(&self, chunk: &[Customer]) -> Result<(), WriteError> {
        let records = chunk.len();
        let fail = |e: rusqlite::Error| WriteError::new(records, e.to_string());

        let mut conn = self.lock_conn();
        // dropping an uncommitted transaction rolls it back
        let tx = conn.transaction().map_err(fail)?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_CUSTOMER).map_err(fail)?;
            for c in chunk {
                stmt.execute(params![
                    c.id,
                    c.first_name,
                    c.last_name,
                    c.email,
                    c.gender,
                    c.contact_no,
                    c.country,
                    c.dob,
                ])
                .map_err(fail)?;
            }
        }
        tx.commit().map_err(fail)
    }
}

/// Stored state of one job execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRow {
    pub id: ExecutionId,
    pub job_name: String,
    pub status: String,
    pub skip_count: i64,
    pub error_message: Option<String>,
    pub finished: bool,
}

/// Stored state of one partition of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRow {
    pub partition_name: String,
    pub min_key: i64,
    pub max_key: i64,
    pub status: String,
    pub read_count: i64,
    pub write_count: i64,
    pub skip_count: i64,
    pub commit_count: i64,
    pub error_message: Option<String>,
}

/// Job executions persisted to `SQLite`.
pub struct SqliteJobRepository {
    conn: Mutex<Connection>,
}

impl SqliteJobRepository {
    /// Open or create the job tables in the database at `path`.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the directory or database can't be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_with(path, CREATE_JOB_TABLES)?),
        })
    }

    /// # Errors
    /// Returns [`StoreError`] if the database can't be initialized.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(in_memory_with(CREATE_JOB_TABLES)?),
        })
    }

    /// # Errors
    /// Returns [`StoreError`] on query failure.
    pub fn execution(&self, id: ExecutionId) -> Result<Option<ExecutionRow>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, job_name, status, skip_count, error_message, finished_at \
                 FROM job_executions WHERE id = ?1",
                [id],
                |row| {
                    Ok(ExecutionRow {
                        id: row.get(0)?,
                        job_name: row.get(1)?,
                        status: row.get(2)?,
                        skip_count: row.get(3)?,
                        error_message: row.get(4)?,
                        finished: row.get::<_, Option<String>>(5)?.is_some(),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Partitions of `execution`, in the order they were recorded.
    ///
    /// # Errors
    /// Returns [`StoreError`] on query failure.
    pub fn partitions(&self, execution: ExecutionId) -> Result<Vec<PartitionRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT partition_name, min_key, max_key, status, read_count, write_count, \
             skip_count, commit_count, error_message \
             FROM partition_executions WHERE execution_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([execution], |row| {
            Ok(PartitionRow {
                partition_name: row.get(0)?,
                min_key: row.get(1)?,
                max_key: row.get(2)?,
                status: row.get(3)?,
                read_count: row.get(4)?,
                write_count: row.get(5)?,
                skip_count: row.get(6)?,
                commit_count: row.get(7)?,
                error_message: row.get(8)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl JobRepository for SqliteJobRepository {
    fn start_job(&self, job_name: &str) -> Result<ExecutionId, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO job_executions (job_name, status, started_at) VALUES (?1, 'STARTED', ?2)",
            params![job_name, now_sqlite()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn record_partition(&self, execution: ExecutionId, result: &PartitionResult) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO partition_executions \
             (execution_id, partition_name, min_key, max_key, status, read_count, write_count, \
              skip_count, commit_count, error_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                execution,
                result.descriptor.name,
                result.descriptor.min_key,
                result.descriptor.max_key,
                result.status.as_str(),
                result.counts.read as i64,
                result.counts.written as i64,
                result.counts.skipped as i64,
                result.counts.commits as i64,
                result.failure.as_ref().map(ToString::to_string),
            ],
        )?;
        Ok(())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn finish_job(&self, execution: ExecutionId, result: &JobResult) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE job_executions \
             SET status = ?1, finished_at = ?2, skip_count = ?3, error_message = ?4 \
             WHERE id = ?5",
            params![
                result.status.as_str(),
                now_sqlite(),
                result.skip_count as i64,
                result.error.as_ref().map(ToString::to_string),
                execution,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownExecution(execution));
        }
        Ok(())
    }
}
