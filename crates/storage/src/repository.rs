//! Repository Implementation

use crate::{ReportSink, StorageError, Table, TableSink, TableSource};
use marine_validator::ValidationReport;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// Worksheets of the marine data workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Worksheet {
    /// Unvalidated master data
    Raw,
    /// Output of the validation pipeline
    Validated,
    /// Date-filtered extract requested by a user
    UserReport,
    /// Findings of every validation run
    ErrorLog,
}

/// In-memory stand-in for the workbook
pub struct Repository {
    raw: Mutex<Table>,
    validated: Mutex<Table>,
    user_report: Mutex<Table>,
    /// Error log lines, header kept separately
    error_log: Mutex<VecDeque<Vec<String>>>,
    error_log_header: Mutex<Option<Vec<String>>>,
    /// Stored reports, most recent last
    reports: Mutex<Vec<ValidationReport>>,
    /// Max error log lines kept
    max_error_log_rows: usize,
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::with_error_log_limit(100_000)
    }

    /// Create a repository keeping at most `max_error_log_rows` log lines
    pub fn with_error_log_limit(max_error_log_rows: usize) -> Self {
        info!("Creating in-memory repository");
        Self {
            raw: Mutex::new(Vec::new()),
            validated: Mutex::new(Vec::new()),
            user_report: Mutex::new(Vec::new()),
            error_log: Mutex::new(VecDeque::new()),
            error_log_header: Mutex::new(None),
            reports: Mutex::new(Vec::new()),
            max_error_log_rows,
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, StorageError> {
        mutex
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    fn sheet(&self, sheet: Worksheet) -> Option<&Mutex<Table>> {
        match sheet {
            Worksheet::Raw => Some(&self.raw),
            Worksheet::Validated => Some(&self.validated),
            Worksheet::UserReport => Some(&self.user_report),
            Worksheet::ErrorLog => None,
        }
    }

    /// Replace a worksheet's content; the error log is appended to instead
    pub fn write(&self, sheet: Worksheet, table: &[Vec<String>]) -> Result<(), StorageError> {
        match self.sheet(sheet) {
            Some(mutex) => {
                *Self::lock(mutex)? = table.to_vec();
                debug!("Stored {} rows in {:?}", table.len(), sheet);
                Ok(())
            }
            None => self.append_error_log(table),
        }
    }

    /// Read a worksheet, header first
    pub fn read(&self, sheet: Worksheet) -> Result<Table, StorageError> {
        match self.sheet(sheet) {
            Some(mutex) => Ok(Self::lock(mutex)?.clone()),
            None => {
                let header = Self::lock(&self.error_log_header)?.clone();
                let log = Self::lock(&self.error_log)?;
                Ok(header.into_iter().chain(log.iter().cloned()).collect())
            }
        }
    }

    /// Append error log lines; the first row of `table` is its header
    fn append_error_log(&self, table: &[Vec<String>]) -> Result<(), StorageError> {
        let Some((header, lines)) = table.split_first() else {
            return Ok(());
        };

        let mut log_header = Self::lock(&self.error_log_header)?;
        if log_header.is_none() {
            *log_header = Some(header.clone());
        }
        drop(log_header);

        if self.max_error_log_rows == 0 {
            debug!("Error log retention is 0, dropping {} lines", lines.len());
            return Ok(());
        }

        let mut log = Self::lock(&self.error_log)?;
        for line in lines {
            // Enforce retention
            while log.len() >= self.max_error_log_rows && log.pop_front().is_some() {}
            log.push_back(line.clone());
        }
        debug!("Appended {} error log lines", lines.len());
        Ok(())
    }

    /// Number of error log lines currently kept
    pub fn error_log_len(&self) -> usize {
        self.error_log.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Most recently stored report
    pub fn latest_report(&self) -> Result<Option<ValidationReport>, StorageError> {
        Ok(Self::lock(&self.reports)?.last().cloned())
    }

    /// Borrow one worksheet as a source/sink
    pub fn worksheet(&self, sheet: Worksheet) -> WorksheetHandle<'_> {
        WorksheetHandle { repo: self, sheet }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for Repository {
    /// Keep the report and append its findings to the error log
    fn store_report(&self, report: &ValidationReport) -> Result<(), StorageError> {
        self.append_error_log(&report.error_log_rows())?;
        Self::lock(&self.reports)?.push(report.clone());
        Ok(())
    }
}

/// One worksheet of a repository
pub struct WorksheetHandle<'a> {
    repo: &'a Repository,
    sheet: Worksheet,
}

impl TableSource for WorksheetHandle<'_> {
    fn load(&self) -> Result<Table, StorageError> {
        self.repo.read(self.sheet)
    }
}

impl TableSink for WorksheetHandle<'_> {
    fn store(&self, table: &[Vec<String>]) -> Result<(), StorageError> {
        self.repo.write(self.sheet, table)
    }
}
