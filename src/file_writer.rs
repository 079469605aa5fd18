//! File writing utilities for exporting filtered admissions.
//!
//! Rows can be written as CSV (header row plus one record per row) or as a
//! JSON array of objects keyed by column name.

use crate::error::Result;
use crate::models::{OutputFormat, Table};
use csv::Writer;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write rows into `output_dir/<timestamp>/admissions.<ext>`.
///
/// # Arguments
///
/// * `table` - Rows to write
/// * `format` - Output format (CSV or JSON)
/// * `output_dir` - Base output directory
/// * `timestamp` - Directory name for this export (e.g., "2025-01-15_14-30-00")
///
/// # Returns
///
/// Path of the created file, or `None` when there was nothing to write
pub fn write_table_to_timestamped_dir(
    table: &Table,
    format: OutputFormat,
    output_dir: &Path,
    timestamp: &str,
) -> Result<Option<PathBuf>> {
    if table.is_empty() {
        return Ok(None);
    }

    let date_dir = output_dir.join(timestamp);
    create_dir_all(&date_dir)?;

    let file_path = date_dir.join(format!("admissions.{}", format.extension()));
    write_table_to_file(table, format, &file_path)?;
    Ok(Some(file_path))
}

/// Write rows to a file in the specified format.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn write_table_to_file(table: &Table, format: OutputFormat, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    match format {
        OutputFormat::Csv => write_csv_file(table, file_path),
        OutputFormat::Json => write_json_file(table, file_path),
    }
}

/// NULL cells are written as empty fields.
fn write_csv_file(table: &Table, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| match cell {
            crate::models::Cell::Null => String::new(),
            other => other.to_string(),
        }))?;
    }

    writer.flush()?;
    Ok(())
}

fn write_json_file(table: &Table, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &table.to_records())?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use tempfile::TempDir;

    fn sample() -> Table {
        Table::new(
            vec!["SEXO".into(), "DIAS_UCI".into()],
            vec![
                vec![Cell::Text("Mujer".into()), Cell::Integer(2)],
                vec![Cell::Text("Hombre".into()), Cell::Null],
            ],
        )
    }

    #[test]
    fn csv_has_header_and_empty_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        write_table_to_file(&sample(), OutputFormat::Csv, &path).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "SEXO,DIAS_UCI\nMujer,2\nHombre,\n");
    }

    #[test]
    fn empty_table_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let written =
            write_table_to_timestamped_dir(&Table::default(), OutputFormat::Json, dir.path(), "ts").unwrap();
        assert!(written.is_none());
        assert!(!dir.path().join("ts").exists());
    }
}
