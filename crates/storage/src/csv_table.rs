//! CSV File Tables

use crate::{StorageError, Table, TableSink, TableSource};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A table stored as a CSV file
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
}

impl CsvTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Append data rows, writing the header only when the file is new or empty
    pub fn append(&self, table: &[Vec<String>]) -> Result<(), StorageError> {
        let has_content = self.path.metadata().map(|m| m.len() > 0).unwrap_or(false);
        let rows = if has_content { table.get(1..).unwrap_or(&[]) } else { table };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;

        debug!("Appended {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }
}

impl TableSource for CsvTable {
    /// Read every record, header included, without reshaping ragged rows
    fn load(&self) -> Result<Table, StorageError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut table = Vec::new();
        for record in reader.records() {
            let record = record?;
            table.push(record.iter().map(|field| field.to_string()).collect());
        }

        info!("Loaded {} rows from {}", table.len(), self.path.display());
        Ok(table)
    }
}

impl TableSink for CsvTable {
    fn store(&self, table: &[Vec<String>]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);

        for row in table {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;

        debug!("Wrote {} rows to {}", table.len(), self.path.display());
        Ok(())
    }
}
