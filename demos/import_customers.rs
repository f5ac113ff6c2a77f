//! Import customers from a CSV file into `SQLite`.
//!
//! ```text
//! cargo run --example import_customers -- [config.toml]
//! ```
//!
//! Without a config file, a sample input with a few malformed rows is
//! generated in a temporary directory. Set `RUST_LOG=debug` to see chunk
//! commits.

use anyhow::Result;
use chunkbeam::io::csv::write_csv_vec;
use chunkbeam::testing::{TempDirPath, customer_with_bad_contact, customer_with_bad_dob, sample_customers};
use chunkbeam::{JobConfig, SqliteCustomerStore, customer_import_job};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<ExitCode> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    // keeps the generated files alive until the end of main
    let scratch = TempDirPath::new()?;
    let config = match std::env::args().nth(1) {
        Some(path) => JobConfig::from_file(path)?,
        None => sample_config(&scratch)?,
    };

    let job = customer_import_job(&config)?;
    let result = job.run();

    let store = SqliteCustomerStore::open(&config.output.database)?;
    info!(
        status = %result.status,
        rows = store.count()?,
        skipped = result.skip_count,
        "import finished"
    );
    if let Some(metrics) = job.metrics() {
        metrics.log_summary();
        metrics.save_to_file(config.output.database.with_extension("metrics.json"))?;
    }

    Ok(if result.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn sample_config(dir: &TempDirPath) -> Result<JobConfig> {
    let mut customers = sample_customers(1200);
    customers[41] = customer_with_bad_contact(42);
    customers[666] = customer_with_bad_dob(667);
    customers[1100] = customer_with_bad_contact(1101);

    let mut config = JobConfig::default();
    config.input.path = dir.file_path("customers.csv");
    config.output.database = dir.file_path("customers.db");
    write_csv_vec(&config.input.path, true, &customers)?;
    info!(path = %config.input.path.display(), rows = customers.len(), "generated sample input");
    Ok(config)
}
