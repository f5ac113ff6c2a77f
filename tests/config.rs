//! Tests for job configuration.

use chunkbeam::config::{InputConfig, SkipConfig};
use chunkbeam::*;
use std::path::PathBuf;

#[test]
fn defaults_match_the_import_job() {
    let config = JobConfig::default();
    assert_eq!(config.job_name, "importCustomers");
    assert_eq!(config.partition_count, 2);
    assert_eq!(config.chunk_size, 500);
    assert_eq!(config.worker_pool_size, 4);
    assert_eq!(config.worker_queue_capacity, 4);
    assert_eq!(config.skip.skippable, vec![ErrorCategory::MalformedField]);
    assert_eq!(config.skip.limit, None);
    assert_eq!(config.input.delimiter, ",");
    assert!(config.input.has_headers);
    assert!(config.validate().is_ok());
}

#[test]
fn empty_document_is_the_default() -> anyhow::Result<()> {
    assert_eq!(JobConfig::from_toml_str("")?, JobConfig::default());
    Ok(())
}

#[test]
fn parses_every_section() -> anyhow::Result<()> {
    let config = JobConfig::from_toml_str(
        r#"
        job_name = "reimport"
        partition_count = 8
        chunk_size = 250
        worker_pool_size = 2
        worker_queue_capacity = 0

        [skip]
        skippable = ["malformed_field", "validation"]
        limit = 25

        [input]
        path = "/data/in.tsv"
        delimiter = "\t"
        has_headers = false

        [output]
        database = "/data/out.db"
        "#,
    )?;

    assert_eq!(config.job_name, "reimport");
    assert_eq!(config.partition_count, 8);
    assert_eq!(config.chunk_size, 250);
    assert_eq!(config.worker_pool_size, 2);
    assert_eq!(config.worker_queue_capacity, 0);
    assert_eq!(
        config.skip,
        SkipConfig {
            skippable: vec![ErrorCategory::MalformedField, ErrorCategory::Validation],
            limit: Some(25),
        }
    );
    assert_eq!(config.input.path, PathBuf::from("/data/in.tsv"));
    assert_eq!(config.input.delimiter_byte()?, b'\t');
    assert!(!config.input.has_headers);
    assert_eq!(config.output.database, PathBuf::from("/data/out.db"));
    Ok(())
}

#[test]
fn rejects_zero_counts() {
    for field in ["partition_count", "chunk_size", "worker_pool_size"] {
        let err = JobConfig::from_toml_str(&format!("{field} = 0")).unwrap_err();
        assert_eq!(err, ConfigError::MustBePositive { field, value: 0 });
    }
}

#[test]
fn rejects_bad_delimiters() {
    for delimiter in ["", ";;", "é"] {
        let input = InputConfig {
            delimiter: delimiter.to_string(),
            ..InputConfig::default()
        };
        assert_eq!(input.delimiter_byte(), Err(ConfigError::Delimiter(delimiter.to_string())));
    }
}

#[test]
fn rejects_malformed_toml() {
    let err = JobConfig::from_toml_str("chunk_size = \"lots\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));

    let err = JobConfig::from_toml_str("[skip]\nskippable = [\"everything\"]").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn loads_from_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("job.toml");
    std::fs::write(&path, "chunk_size = 42\n[input]\npath = \"customers.csv\"\n")?;

    let config = JobConfig::from_file(&path)?;
    assert_eq!(config.chunk_size, 42);
    assert_eq!(config.partition_count, 2);

    let missing = JobConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Parse(ref m) if m.contains("absent.toml")));
    Ok(())
}

#[test]
fn demo_config_is_valid() -> anyhow::Result<()> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/import_customers.toml");
    assert_eq!(JobConfig::from_file(path)?, JobConfig::default());
    Ok(())
}

#[test]
fn skip_config_builds_policy() {
    let malformed = TransformError::malformed("dob", "bad date");
    let invalid = TransformError::validation("email", "bad email");

    let policy = SkipConfig::default().policy();
    assert_eq!(policy.classify(&malformed, 1000), SkipDecision::Skip);
    assert_eq!(policy.classify(&invalid, 0), SkipDecision::Fail);

    let limited = SkipConfig {
        skippable: vec![ErrorCategory::Validation],
        limit: Some(1),
    }
    .policy();
    assert_eq!(limited.classify(&invalid, 0), SkipDecision::Skip);
    assert_eq!(limited.classify(&invalid, 1), SkipDecision::Fail);
    assert_eq!(limited.classify(&malformed, 0), SkipDecision::Fail);
}
