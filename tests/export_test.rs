//! Export of filtered admissions to CSV and JSON files

mod common;

use std::fs;

use admissions_explorer::db::AdmissionsStore;
use admissions_explorer::file_writer::{write_table_to_file, write_table_to_timestamped_dir};
use admissions_explorer::models::{OutputFormat, Table};
use tempfile::TempDir;

fn women() -> Table {
    let store = common::seeded_memory_store();
    store
        .query(
            "SELECT ID, SEXO, COMUNIDAD_ATENCION FROM VISTAMUYINTERESANTE WHERE SEXO = :1",
            &[admissions_explorer::models::SqlValue::Text("Mujer".into())],
        )
        .unwrap()
}

#[test]
fn test_csv_export() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mujeres.csv");

    write_table_to_file(&women(), OutputFormat::Csv, &path).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["ID", "SEXO", "COMUNIDAD_ATENCION"]
    );
    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 12);
    assert_eq!(&records[0][0], "2");
    assert_eq!(&records[0][1], "Mujer");
}

#[test]
fn test_json_export() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out").join("mujeres.json");

    write_table_to_file(&women(), OutputFormat::Json, &path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[0]["ID"], 2);
    assert_eq!(rows[0]["SEXO"], "Mujer");
}

#[test]
fn test_timestamped_export() {
    let dir = TempDir::new().unwrap();

    let path = write_table_to_timestamped_dir(&women(), OutputFormat::Csv, dir.path(), "2024-05-01_10-00-00")
        .unwrap()
        .unwrap();

    assert_eq!(path, dir.path().join("2024-05-01_10-00-00").join("admissions.csv"));
    assert!(path.exists());
}

#[test]
fn test_output_format_parsing() {
    assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
    assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    assert!("xlsx".parse::<OutputFormat>().is_err());
    assert_eq!(OutputFormat::Json.extension(), "json");
}
