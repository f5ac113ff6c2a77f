#![cfg(feature = "io-csv")]
//! Tests for the CSV customer source.

use chunkbeam::testing::*;
use chunkbeam::*;
use std::sync::Arc;

const HEADER: &str = "id,firstName,lastName,email,gender,contactNo,country,dob\n";

fn ids(source: &CsvCustomerSource, range: KeyRange) -> anyhow::Result<Vec<i64>> {
    let cursor = source.open(range)?;
    Ok(cursor.map(|r| r.map(|c| c.id)).collect::<Result<_, _>>()?)
}

#[test]
fn scans_bounds_of_sorted_file() -> anyhow::Result<()> {
    let file = mock_customers_csv(&sample_customers(25))?;
    let source = CsvCustomerSource::new(file.path(), CsvOptions::default());

    let summary = source.scan()?;
    assert_eq!(summary.bounds, Some(KeyRange::new(1, 25)));
    assert_eq!(summary.rows, 25);
    assert!(summary.sorted);
    assert_eq!(source.key_bounds()?, Some(KeyRange::new(1, 25)));
    Ok(())
}

#[test]
fn reads_one_range_in_order() -> anyhow::Result<()> {
    let file = mock_customers_csv(&sample_customers(25))?;
    let source = CsvCustomerSource::new(file.path(), CsvOptions::default());
    source.scan()?;

    assert_eq!(ids(&source, KeyRange::new(10, 14))?, vec![10, 11, 12, 13, 14]);
    assert_eq!(ids(&source, KeyRange::new(24, 40))?, vec![24, 25]);
    assert!(ids(&source, KeyRange::new(100, 200))?.is_empty());
    Ok(())
}

#[test]
fn unsorted_file_is_read_in_key_order() -> anyhow::Result<()> {
    let mut customers = sample_customers(12);
    customers.swap(0, 11);
    customers.swap(3, 7);
    let file = mock_customers_csv(&customers)?;
    let source = CsvCustomerSource::new(file.path(), CsvOptions::default());

    let summary = source.scan()?;
    assert!(!summary.sorted);
    assert_eq!(summary.bounds, Some(KeyRange::new(1, 12)));
    assert_eq!(ids(&source, KeyRange::new(1, 6))?, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(ids(&source, KeyRange::new(7, 12))?, vec![7, 8, 9, 10, 11, 12]);
    Ok(())
}

#[test]
fn open_scans_when_bounds_were_never_read() -> anyhow::Result<()> {
    let file = mock_customers_csv(&sample_customers(20))?;
    let source = CsvCustomerSource::new(file.path(), CsvOptions::default());
    assert_eq!(source.last_scan(), None);

    assert_eq!(ids(&source, KeyRange::new(5, 7))?, vec![5, 6, 7]);
    let summary = source.last_scan().expect("open scans the file");
    assert!(summary.sorted);
    assert_eq!(summary.rows, 20);
    Ok(())
}

#[test]
fn explicit_partitioner_streams_sorted_input() -> anyhow::Result<()> {
    let file = mock_customers_csv(&sample_customers(60))?;
    let source = Arc::new(CsvCustomerSource::new(file.path(), CsvOptions::default()));
    let store = Arc::new(InMemoryStore::<Customer>::new());
    let job = Job::<Customer, Customer>::builder("importCustomers")
        .partitioner(Arc::new(KeyRange::new(1, 60)))
        .source(source.clone())
        .processor(Arc::new(CustomerProcessor))
        .writer(store.clone())
        .build()?;

    assert!(job.run().is_completed());
    assert_eq!(store.len(), 60);
    assert!(source.last_scan().is_some_and(|s| s.sorted));
    Ok(())
}

#[test]
fn reads_full_records() -> anyhow::Result<()> {
    let expected = sample_customers(3);
    let file = mock_customers_csv(&expected)?;
    let source = CsvCustomerSource::new(file.path(), CsvOptions::default());

    let read: Vec<Customer> = source.open(KeyRange::new(1, 3))?.collect::<Result<_, _>>()?;
    assert_eq!(read, expected);
    Ok(())
}

#[test]
fn short_rows_are_padded_with_empty_fields() -> anyhow::Result<()> {
    let file = mock_csv_text(&format!(
        "{HEADER}1,Ada,Lovelace,ada@example.com\n2,Alan,Turing,alan@example.com,Male,123,UK,1912-06-23,extra\n"
    ))?;
    let source = CsvCustomerSource::new(file.path(), CsvOptions::default());

    let read: Vec<Customer> = source.open(KeyRange::new(1, 2))?.collect::<Result<_, _>>()?;
    assert_eq!(read[0].email, "ada@example.com");
    assert_eq!(read[0].gender, "");
    assert_eq!(read[0].dob, "");
    assert_eq!(read[1].dob, "1912-06-23");
    Ok(())
}

#[test]
fn non_numeric_id_is_a_read_error() -> anyhow::Result<()> {
    let file = mock_csv_text(&format!(
        "{HEADER}1,A,B,a@b.co,F,1,X,2000-01-01\nabc,C,D,c@d.co,M,2,Y,2000-01-02\n"
    ))?;
    let source = CsvCustomerSource::new(file.path(), CsvOptions::default());

    let err = source.key_bounds().unwrap_err();
    assert!(err.message.contains("record #2"), "{err}");
    assert!(err.message.contains("abc"), "{err}");
    Ok(())
}

#[test]
fn custom_delimiter_without_header() -> anyhow::Result<()> {
    let file = mock_csv_text("3;C;c;c@x.io;F;3;Z;2001-01-03\n1;A;a;a@x.io;F;1;Z;2001-01-01\n")?;
    let options = CsvOptions {
        delimiter: b';',
        has_headers: false,
    };
    let source = CsvCustomerSource::new(file.path(), options);

    assert_eq!(source.key_bounds()?, Some(KeyRange::new(1, 3)));
    assert_eq!(ids(&source, KeyRange::new(1, 3))?, vec![1, 3]);
    Ok(())
}

#[test]
fn header_only_file_has_no_bounds() -> anyhow::Result<()> {
    let file = mock_csv_text(HEADER)?;
    let source = CsvCustomerSource::new(file.path(), CsvOptions::default());
    assert_eq!(source.key_bounds()?, None);
    Ok(())
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDirPath::new().unwrap();
    let source = CsvCustomerSource::new(dir.file_path("nope.csv"), CsvOptions::default());
    assert!(source.key_bounds().is_err());
    assert!(source.open(KeyRange::new(1, 2)).is_err());
}

#[test]
fn csv_job_end_to_end() -> anyhow::Result<()> {
    let mut customers = sample_customers(1200);
    customers[99] = customer_with_bad_dob(100);
    let file = mock_customers_csv(&customers)?;
    let store = Arc::new(InMemoryStore::<Customer>::new());

    let job = Job::<Customer, Customer>::builder("importCustomers")
        .source(Arc::new(CsvCustomerSource::new(file.path(), CsvOptions::default())))
        .processor(Arc::new(CustomerProcessor))
        .writer(store.clone())
        .build()?;
    let result = job.run();

    assert!(result.is_completed());
    assert_eq!(result.skip_count, 1);
    assert_eq!(store.len(), 1199);
    assert_eq!(store.chunk_sizes().iter().filter(|&&n| n == 500).count(), 2);
    Ok(())
}

#[test]
fn write_csv_vec_creates_parent_directories() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let path = dir.file_path("nested/out/customers.csv");
    let written = chunkbeam::io::csv::write_csv_vec(&path, true, &sample_customers(2))?;
    assert_eq!(written, 2);
    let contents = std::fs::read_to_string(&path)?;
    assert!(contents.starts_with(HEADER));
    Ok(())
}
