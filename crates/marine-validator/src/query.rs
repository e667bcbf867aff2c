//! Date-Range Selection over Validated Data

use crate::error::ValidationError;
use crate::record::{Dataset, TIME_COLUMN};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

/// Day format accepted for range bounds
pub const DAY_FORMAT: &str = "%d-%m-%Y";

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::InvalidRange {
                from: from.format(DAY_FORMAT).to_string(),
                to: to.format(DAY_FORMAT).to_string(),
            });
        }
        Ok(Self { from, to })
    }

    /// Parse `DD-MM-YYYY` bounds
    pub fn parse(from: &str, to: &str) -> Result<Self, ValidationError> {
        let day = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), DAY_FORMAT).map_err(|e| {
                ValidationError::InvalidFormat(format!("{s:?} is not a DD-MM-YYYY date: {e}"))
            })
        };
        Self::new(day(from)?, day(to)?)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }
}

/// Rows of a validated dataset whose timestamp falls inside `range`
///
/// `display_format` is the format the timestamp stage rendered with.
pub fn select_range(
    dataset: &Dataset,
    range: &DateRange,
    display_format: &str,
) -> Result<Dataset, ValidationError> {
    let idx = dataset.require_column(TIME_COLUMN)?;

    let selected = dataset
        .records()
        .iter()
        .filter(|record| {
            let raw = &record.values[idx];
            match NaiveDateTime::parse_from_str(raw, display_format) {
                Ok(at) => range.contains(at.date()),
                Err(e) => {
                    debug!(
                        "Row {}: skipping unparseable time {:?}: {}",
                        record.sheet_row(),
                        raw,
                        e
                    );
                    false
                }
            }
        })
        .cloned()
        .collect();

    let selected = dataset.with_records(selected);
    info!(
        "Selected {} of {} rows between {} and {}",
        selected.len(),
        dataset.len(),
        range.from,
        range.to
    );
    Ok(selected)
}
