//! Marine Sensor Data Validation
//!
//! Cleans tabular marine sensor readings (pressure, wind, wave, temperature,
//! humidity) through a fixed sequence of stages and reports what each stage
//! found. No I/O happens here: callers hand in a table and get back a
//! cleaned dataset plus a `ValidationReport`.

mod config;
mod duplicate;
mod error;
mod missing;
mod outcome;
mod outlier;
mod pipeline;
mod query;
mod record;
mod report;
mod statistics;
mod timestamp;

pub use config::{
    Deviation, MissingValueConfig, OutlierConfig, PipelineConfig, TimestampConfig,
    TimestampPolicy, ZScoreMethod,
};
pub use duplicate::{DuplicateResult, DuplicateValidator};
pub use error::{SchemaError, ValidationError};
pub use missing::{ColumnCount, MissingValueResult, MissingValueValidator};
pub use outcome::StageOutcome;
pub use outlier::{
    CoercionWarning, GroupOutliers, MetricGroup, OutlierDetector, OutlierHit, OutlierReport,
};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use query::{select_range, DateRange, DAY_FORMAT};
pub use record::{ColumnProjector, Dataset, Record, REQUIRED_COLUMNS, TIME_COLUMN};
pub use report::{Stage, StageFailure, ValidationReport, ERROR_LOG_HEADER};
pub use statistics::{z_scores, ColumnStatistics};
pub use timestamp::{
    CalendarAnomaly, InconsistentTimestamp, RejectReason, TimestampNormalizer, TimestampResult,
};
