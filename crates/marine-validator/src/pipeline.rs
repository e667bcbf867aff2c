//! Validation Pipeline
//!
//! Runs the stages in a fixed order:
//! missing values, duplicates, outliers (report only), timestamps.
//! Each stage owns the dataset it receives and hands the cleaned one on.

use crate::config::PipelineConfig;
use crate::duplicate::DuplicateValidator;
use crate::error::SchemaError;
use crate::missing::MissingValueValidator;
use crate::outlier::OutlierDetector;
use crate::record::{ColumnProjector, Dataset, TIME_COLUMN};
use crate::report::{Stage, ValidationReport};
use crate::timestamp::TimestampNormalizer;
use metrics::counter;
use tracing::{error, info, info_span, warn};

/// Cleaned dataset plus the report describing how it was cleaned
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub dataset: Dataset,
    pub report: ValidationReport,
}

impl PipelineOutcome {
    /// Whether every stage ran to completion
    pub fn is_complete(&self) -> bool {
        !self.report.has_failures()
    }

    /// Validated rows as header + rows
    pub fn to_table(&self) -> Vec<Vec<String>> {
        self.dataset.to_table()
    }
}

/// The validation pipeline
pub struct Pipeline {
    config: PipelineConfig,
    missing: MissingValueValidator,
    duplicates: DuplicateValidator,
    outliers: OutlierDetector,
}

impl Pipeline {
    /// Create a new pipeline with given config
    pub fn new(config: PipelineConfig) -> Self {
        info!("Creating validation pipeline with config: {:?}", config);
        Self {
            missing: MissingValueValidator::new(config.missing.clone()),
            duplicates: DuplicateValidator::new(),
            outliers: OutlierDetector::new(config.outlier.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate a raw table whose first row is the header
    ///
    /// Only a header problem aborts the run. Anything going wrong after that
    /// is recorded in the report and the outcome carries whatever was
    /// validated up to that point.
    pub fn run(&self, table: Vec<Vec<String>>) -> Result<PipelineOutcome, SchemaError> {
        let mut rows = table.into_iter();
        let header = rows.next().ok_or_else(|| {
            error!("Input table is empty");
            SchemaError::EmptyInput
        })?;
        let projector = ColumnProjector::resolve(&header).map_err(|e| {
            error!("Schema check failed: {}", e);
            e
        })?;

        let rows: Vec<Vec<String>> = rows.collect();
        let input_rows = rows.len();

        match projector.project(rows) {
            Ok(dataset) => Ok(self.run_dataset(dataset)),
            Err(e) => {
                let mut report = ValidationReport::new(input_rows);
                Self::fail(&mut report, Stage::ColumnProjection, &e);
                Ok(PipelineOutcome {
                    dataset: Dataset::empty(),
                    report,
                })
            }
        }
    }

    /// Validate an already projected dataset
    pub fn run_dataset(&self, dataset: Dataset) -> PipelineOutcome {
        let mut report = ValidationReport::new(dataset.len());
        let span = info_span!("validation", run_id = %report.run_id);
        let _enter = span.enter();

        info!("Validating {} rows", dataset.len());
        counter!("marine_rows_in_total").increment(dataset.len() as u64);

        let missing = self.missing.validate(dataset);
        report.record_missing(&missing);
        Self::count_removed(Stage::MissingValues, missing.outcome.removed_count());
        let dataset = missing.outcome.into_dataset();

        let duplicates = self.duplicates.validate(dataset);
        report.record_duplicates(&duplicates);
        Self::count_removed(Stage::Duplicates, duplicates.outcome.removed_count());
        let dataset = duplicates.outcome.into_dataset();

        // Report only: reads the deduplicated rows, the timestamp stage
        // still receives them unchanged
        match self.outliers.detect(&dataset) {
            Ok(outliers) => {
                for group in &outliers.groups {
                    counter!("marine_outlier_rows_total", "group" => group.group.name())
                        .increment(group.rows.len() as u64);
                }
                report.record_outliers(outliers);
            }
            Err(e) => Self::fail(&mut report, Stage::Outliers, &e),
        }

        let normalizer = TimestampNormalizer::new(self.config.timestamp.clone())
            .and_then(|n| dataset.require_column(TIME_COLUMN).map(|_| n));
        let dataset = match normalizer {
            Ok(normalizer) => match normalizer.normalize(dataset) {
                Ok(result) => {
                    report.record_timestamps(&result);
                    Self::count_removed(Stage::Timestamps, result.outcome.removed_count());
                    result.outcome.into_dataset()
                }
                Err(e) => {
                    Self::fail(&mut report, Stage::Timestamps, &e);
                    Dataset::empty()
                }
            },
            Err(e) => {
                Self::fail(&mut report, Stage::Timestamps, &e);
                dataset
            }
        };

        report.output_rows = dataset.len();
        info!(
            "Validation finished: {} rows in, {} rows out, {} failures",
            report.input_rows,
            report.output_rows,
            report.failures.len()
        );

        PipelineOutcome { dataset, report }
    }

    fn count_removed(stage: Stage, removed: usize) {
        counter!("marine_rows_removed_total", "stage" => stage.name()).increment(removed as u64);
    }

    fn fail(report: &mut ValidationReport, stage: Stage, err: &dyn std::error::Error) {
        warn!("Stage {} failed: {}", stage, err);
        counter!("marine_stage_failures_total", "stage" => stage.name()).increment(1);
        report.record_failure(stage, err.to_string());
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
