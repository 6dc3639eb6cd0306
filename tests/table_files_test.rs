mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use sai_alpha::{
    generate_dataset,
    models::{Client, Invoice, Seller},
    tables::{dataset_exists, load_dataset, read_table, write_dataset, TableRecord},
    GeneratorConfig, TableError,
};

use common::{dataset, small_config};

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn written_directory_is_recognised_as_a_dataset() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!dataset_exists(dir.path()));
    write_dataset(dir.path(), dataset()).unwrap();
    assert!(dataset_exists(dir.path()));
}

#[test]
fn headers_carry_counts_and_the_last_fx_date() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), dataset()).unwrap();

    let bytes = fs::read(dir.path().join(Seller::SCHEMA.file_name())).unwrap();
    assert_eq!(bytes[0], 0x03);
    // 2023-12-31, year stored as offset from 1900
    assert_eq!(&bytes[1..4], &[123u8, 12, 31]);
    let count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    assert_eq!(count as usize, dataset().sellers.len());
    assert_eq!(bytes.last(), Some(&0x1A));
}

#[test]
fn truncated_table_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), dataset()).unwrap();
    let path = dir.path().join(Client::SCHEMA.file_name());
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    assert_matches!(load_dataset(dir.path()), Err(TableError::Malformed { table, .. }) if table == "clientes");
}

#[test]
fn table_with_foreign_columns_is_a_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), dataset()).unwrap();
    fs::copy(
        dir.path().join(Seller::SCHEMA.file_name()),
        dir.path().join(Client::SCHEMA.file_name()),
    )
    .unwrap();

    assert_matches!(read_table::<Client>(dir.path()), Err(TableError::SchemaMismatch { .. }));
}

#[test]
fn missing_table_fails_with_io_error() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), dataset()).unwrap();
    fs::remove_file(dir.path().join(Seller::SCHEMA.file_name())).unwrap();

    assert!(!dataset_exists(dir.path()));
    assert_matches!(load_dataset(dir.path()), Err(TableError::Io(_)));
}

#[test]
fn failed_replace_restores_the_previous_tables() {
    let dir = tempfile::tempdir().unwrap();
    let previous = generate_dataset(&GeneratorConfig { seed: 999, ..small_config() }).unwrap();
    write_dataset(dir.path(), &previous).unwrap();

    // A directory in place of facturas.dbf makes that rename fail after five tables
    // have already been replaced.
    let invoices = dir.path().join(Invoice::SCHEMA.file_name());
    fs::remove_file(&invoices).unwrap();
    fs::create_dir(&invoices).unwrap();
    let before: BTreeMap<String, Vec<u8>> = file_names(dir.path())
        .into_iter()
        .filter(|name| name.as_str() != Invoice::SCHEMA.file_name())
        .map(|name| {
            let bytes = fs::read(dir.path().join(&name)).unwrap();
            (name, bytes)
        })
        .collect();

    let err = write_dataset(dir.path(), dataset()).unwrap_err();
    assert_matches!(&err, TableError::Persist { table, .. } if table == "facturas");
    drop(err);

    for (name, bytes) in &before {
        assert_eq!(&fs::read(dir.path().join(name)).unwrap(), bytes, "{} was modified", name);
    }
    assert_eq!(file_names(dir.path()).len(), 8, "staged files left behind");
}

#[test]
fn encoding_failure_touches_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut broken = dataset().clone();
    broken.orders[0].qty_ordered = 10_000_000;

    assert_matches!(write_dataset(dir.path(), &broken), Err(TableError::Overflow { .. }));
    assert!(file_names(dir.path()).is_empty());
    assert!(!dataset_exists(dir.path()));
}
