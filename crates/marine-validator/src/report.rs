//! Validation Report

use crate::duplicate::DuplicateResult;
use crate::missing::{ColumnCount, MissingValueResult};
use crate::outlier::{CoercionWarning, GroupOutliers, OutlierReport};
use crate::record::Record;
use crate::timestamp::{CalendarAnomaly, InconsistentTimestamp, RejectReason, TimestampResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ColumnProjection,
    MissingValues,
    Duplicates,
    Outliers,
    Timestamps,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::ColumnProjection => "column_projection",
            Stage::MissingValues => "missing_values",
            Stage::Duplicates => "duplicates",
            Stage::Outliers => "outliers",
            Stage::Timestamps => "timestamps",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage that could not finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub description: String,
}

/// Everything one run found, separate from the cleaned dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub input_rows: usize,
    pub output_rows: usize,

    /// Per-column missing cells, counted before removal
    pub missing_counts: Vec<ColumnCount>,
    pub missing_rows_removed: usize,

    /// Every row taking part in a duplicate group
    pub duplicate_rows: Vec<Record>,
    pub duplicate_count: usize,
    pub duplicates_removed: usize,

    /// One entry per metric group
    pub outliers: Vec<GroupOutliers>,
    pub coercion_warnings: Vec<CoercionWarning>,

    pub inconsistent_timestamps: Vec<InconsistentTimestamp>,
    pub calendar_anomalies: Vec<CalendarAnomaly>,

    pub failures: Vec<StageFailure>,
}

/// Header of the error-log table
pub const ERROR_LOG_HEADER: [&str; 6] = [
    "run_id",
    "generated_at",
    "category",
    "row",
    "column",
    "detail",
];

impl ValidationReport {
    /// Empty report for a run over `input_rows` rows
    pub fn new(input_rows: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            input_rows,
            output_rows: 0,
            missing_counts: Vec::new(),
            missing_rows_removed: 0,
            duplicate_rows: Vec::new(),
            duplicate_count: 0,
            duplicates_removed: 0,
            outliers: Vec::new(),
            coercion_warnings: Vec::new(),
            inconsistent_timestamps: Vec::new(),
            calendar_anomalies: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_missing(&mut self, result: &MissingValueResult) {
        self.missing_counts = result.counts.clone();
        self.missing_rows_removed = result.outcome.removed_count();
    }

    pub fn record_duplicates(&mut self, result: &DuplicateResult) {
        self.duplicate_rows = result.duplicates.clone();
        self.duplicate_count = result.duplicate_count();
        self.duplicates_removed = result.outcome.removed_count();
    }

    pub fn record_outliers(&mut self, report: OutlierReport) {
        self.outliers = report.groups;
        self.coercion_warnings = report.coercion_warnings;
    }

    pub fn record_timestamps(&mut self, result: &TimestampResult) {
        self.inconsistent_timestamps = result.inconsistent.clone();
        self.calendar_anomalies = result.calendar_anomalies.clone();
    }

    pub fn record_failure(&mut self, stage: Stage, description: impl Into<String>) {
        self.failures.push(StageFailure {
            stage,
            description: description.into(),
        });
    }

    pub fn timestamps_rejected(&self) -> usize {
        self.inconsistent_timestamps.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Rows removed by all stages together
    pub fn rows_removed(&self) -> usize {
        self.missing_rows_removed + self.duplicates_removed + self.timestamps_rejected()
    }

    /// Render as an error-log table: header, then one line per finding
    pub fn error_log_rows(&self) -> Vec<Vec<String>> {
        let run_id = self.run_id.to_string();
        let generated_at = self.generated_at.to_rfc3339();
        let line = |category: &str, row: Option<usize>, column: &str, detail: String| {
            vec![
                run_id.clone(),
                generated_at.clone(),
                category.to_string(),
                row.map(|r| r.to_string()).unwrap_or_default(),
                column.to_string(),
                detail,
            ]
        };
        let sheet_row = |sequence: usize| Some(sequence + 2);

        let mut rows: Vec<Vec<String>> =
            vec![ERROR_LOG_HEADER.iter().map(|h| h.to_string()).collect()];

        for count in self.missing_counts.iter().filter(|c| c.missing > 0) {
            rows.push(line(
                "missing_value",
                None,
                &count.column,
                format!("{} missing", count.missing),
            ));
        }
        for record in &self.duplicate_rows {
            rows.push(line(
                "duplicate",
                sheet_row(record.sequence),
                "",
                record.values.join(","),
            ));
        }
        for group in &self.outliers {
            for hit in &group.hits {
                rows.push(line(
                    "outlier",
                    sheet_row(hit.sequence),
                    &hit.column,
                    format!(
                        "{} group: value {} z-score {:.2}",
                        group.group, hit.value, hit.z_score
                    ),
                ));
            }
        }
        for warning in &self.coercion_warnings {
            rows.push(line(
                "non_numeric",
                sheet_row(warning.sequence),
                &warning.column,
                warning.raw.clone(),
            ));
        }
        for ts in &self.inconsistent_timestamps {
            let category = match ts.reason {
                RejectReason::PatternMismatch => "timestamp_format",
                RejectReason::InvalidCalendar => "timestamp_calendar",
            };
            rows.push(line(category, sheet_row(ts.sequence), "time", ts.raw.clone()));
        }
        for anomaly in &self.calendar_anomalies {
            rows.push(line(
                "timestamp_anomaly",
                sheet_row(anomaly.sequence),
                "time",
                format!("{} kept as {}", anomaly.raw, anomaly.rendered),
            ));
        }
        for failure in &self.failures {
            rows.push(line(
                "stage_failure",
                None,
                failure.stage.name(),
                failure.description.clone(),
            ));
        }

        rows
    }
}
