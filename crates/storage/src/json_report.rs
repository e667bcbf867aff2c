//! JSON Report Files

use crate::{ReportSink, StorageError};
use marine_validator::ValidationReport;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// Writes the validation report as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct JsonReportFile {
    path: PathBuf,
}

impl JsonReportFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for JsonReportFile {
    fn store_report(&self, report: &ValidationReport) -> Result<(), StorageError> {
        let io_error = |source| StorageError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let file = File::create(&self.path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush().map_err(io_error)?;

        info!("Wrote report {} to {}", report.run_id, self.path.display());
        Ok(())
    }
}
