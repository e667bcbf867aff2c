//! Timestamp Normalizer

use crate::config::{TimestampConfig, TimestampPolicy};
use crate::error::ValidationError;
use crate::outcome::StageOutcome;
use crate::record::{Dataset, TIME_COLUMN};
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// `YYYY-MM-DDTHH:MM:SSZ`, ASCII digits only
static ISO_UTC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}Z$")
        .expect("timestamp pattern compiles")
});

const ISO_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Why a timestamp was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Does not have the `YYYY-MM-DDTHH:MM:SSZ` shape
    PatternMismatch,
    /// Right shape, impossible date or time (calendar policy only)
    InvalidCalendar,
}

/// A row dropped for its timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InconsistentTimestamp {
    pub sequence: usize,
    pub raw: String,
    pub reason: RejectReason,
}

/// A row kept under the format-only policy although its date is impossible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarAnomaly {
    pub sequence: usize,
    pub raw: String,
    pub rendered: String,
}

/// Timestamp stage result
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampResult {
    pub outcome: StageOutcome,
    pub inconsistent: Vec<InconsistentTimestamp>,
    pub calendar_anomalies: Vec<CalendarAnomaly>,
}

/// Checks the `time` column and rewrites it in display form
#[derive(Debug)]
pub struct TimestampNormalizer {
    config: TimestampConfig,
}

impl TimestampNormalizer {
    /// Create a normalizer, rejecting display formats chrono cannot render
    pub fn new(config: TimestampConfig) -> Result<Self, ValidationError> {
        if StrftimeItems::new(&config.display_format).any(|item| matches!(item, Item::Error)) {
            return Err(ValidationError::InvalidFormat(format!(
                "unusable display format {:?}",
                config.display_format
            )));
        }
        Ok(Self { config })
    }

    /// Whether a raw value has the expected shape
    pub fn matches_pattern(raw: &str) -> bool {
        ISO_UTC.is_match(raw)
    }

    /// Rearrange the digit groups of a pattern-conforming value
    fn rearrange(raw: &str) -> String {
        format!(
            "{}-{}-{}T{}:{}:{}",
            &raw[8..10],
            &raw[5..7],
            &raw[0..4],
            &raw[11..13],
            &raw[14..16],
            &raw[17..19]
        )
    }

    /// Drop rows with non-conforming timestamps, render the rest
    pub fn normalize(&self, dataset: Dataset) -> Result<TimestampResult, ValidationError> {
        let idx = dataset.require_column(TIME_COLUMN)?;
        let input_rows = dataset.len();
        let template = dataset.with_records(Vec::new());

        let mut kept = Vec::with_capacity(input_rows);
        let mut removed = Vec::new();
        let mut inconsistent = Vec::new();
        let mut calendar_anomalies = Vec::new();

        for mut record in dataset.into_records() {
            let raw = record.values[idx].clone();

            if !Self::matches_pattern(&raw) {
                debug!("Row {}: timestamp {:?} has the wrong shape", record.sheet_row(), raw);
                inconsistent.push(InconsistentTimestamp {
                    sequence: record.sequence,
                    raw,
                    reason: RejectReason::PatternMismatch,
                });
                removed.push(record);
                continue;
            }

            let rendered = match NaiveDateTime::parse_from_str(&raw, ISO_UTC_FORMAT) {
                Ok(naive) => Utc
                    .from_utc_datetime(&naive)
                    .format(&self.config.display_format)
                    .to_string(),
                Err(_) if self.config.policy == TimestampPolicy::Calendar => {
                    debug!("Row {}: timestamp {:?} is not a real date", record.sheet_row(), raw);
                    inconsistent.push(InconsistentTimestamp {
                        sequence: record.sequence,
                        raw,
                        reason: RejectReason::InvalidCalendar,
                    });
                    removed.push(record);
                    continue;
                }
                Err(_) => {
                    let rendered = Self::rearrange(&raw);
                    warn!(
                        "Row {}: timestamp {:?} is not a real date, kept as {}",
                        record.sheet_row(),
                        raw,
                        rendered
                    );
                    calendar_anomalies.push(CalendarAnomaly {
                        sequence: record.sequence,
                        raw,
                        rendered: rendered.clone(),
                    });
                    rendered
                }
            };

            record.values[idx] = rendered;
            kept.push(record);
        }

        info!(
            "Timestamp check: {} rows in, {} rejected, {} calendar anomalies",
            input_rows,
            removed.len(),
            calendar_anomalies.len()
        );

        Ok(TimestampResult {
            outcome: StageOutcome::new(template.with_records(kept), removed),
            inconsistent,
            calendar_anomalies,
        })
    }
}
