//! Storage Layer
//!
//! Table and report persistence around the validation core: CSV files, JSON
//! report files and an in-memory worksheet repository.

mod csv_table;
mod json_report;
mod repository;

pub use csv_table::CsvTable;
pub use json_report::JsonReportFile;
pub use repository::{Repository, Worksheet, WorksheetHandle};

use marine_validator::ValidationReport;
use thiserror::Error;

/// A table: header row followed by data rows
pub type Table = Vec<Vec<String>>;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Where raw rows come from
pub trait TableSource {
    fn load(&self) -> Result<Table, StorageError>;
}

/// Where tables go (validated data, user reports, error logs)
pub trait TableSink {
    fn store(&self, table: &[Vec<String>]) -> Result<(), StorageError>;
}

/// Where the structured report goes
pub trait ReportSink {
    fn store_report(&self, report: &ValidationReport) -> Result<(), StorageError>;
}
