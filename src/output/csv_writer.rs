//! CSV table writer
//!
//! Writes into a temporary file next to the target and renames it into place,
//! so an interrupted export never leaves a half-written file behind.

use crate::output::traits::{OutputError, OutputResult, Table, TableWriter};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes tables as UTF-8 CSV
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableWriter;

impl TableWriter for CsvTableWriter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write_table(&self, path: &Path, table: &Table) -> OutputResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(temp.as_file_mut());
            writer.write_record(&table.columns)?;
            for row in &table.rows {
                if row.len() != table.columns.len() {
                    return Err(OutputError::Write(format!(
                        "row has {} cells, expected {}",
                        row.len(),
                        table.columns.len()
                    )));
                }
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| OutputError::Io(e.error))?;

        Ok(())
    }
}
