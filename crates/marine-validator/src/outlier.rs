//! Outlier Detector
//!
//! Scores the numeric columns of each metric group and reports rows whose
//! score exceeds the configured threshold. Detection never changes the
//! dataset it is given.

use crate::config::OutlierConfig;
use crate::error::ValidationError;
use crate::record::{Dataset, Record};
use crate::statistics::z_scores;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Fixed partition of the numeric columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricGroup {
    Atmospheric,
    Wind,
    Wave,
    Temperature,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 4] = [
        MetricGroup::Atmospheric,
        MetricGroup::Wind,
        MetricGroup::Wave,
        MetricGroup::Temperature,
    ];

    /// Columns scored for this group
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            MetricGroup::Atmospheric => &["AtmosphericPressure"],
            MetricGroup::Wind => &["WindSpeed", "Gust"],
            MetricGroup::Wave => &["WaveHeight", "WavePeriod", "MeanWaveDirection"],
            MetricGroup::Temperature => &["AirTemperature", "SeaTemperature"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MetricGroup::Atmospheric => "atmospheric",
            MetricGroup::Wind => "wind",
            MetricGroup::Wave => "wave",
            MetricGroup::Temperature => "temperature",
        }
    }
}

impl fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Non-numeric content in a numeric cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionWarning {
    pub sequence: usize,
    pub column: String,
    pub raw: String,
}

/// One field that pushed a row over the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierHit {
    pub sequence: usize,
    pub column: String,
    pub value: f64,
    /// Infinite when the rest of the column is constant; JSON carries it as
    /// `"inf"` / `"-inf"`
    #[serde(with = "extended_f64")]
    pub z_score: f64,
}

/// Serde for floats that may be infinite
///
/// JSON has no infinity, and serde_json writes it as `null`.
mod extended_f64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a number, \"inf\", \"-inf\" or \"nan\"",
                )),
            },
        }
    }
}

/// Outliers found in one metric group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupOutliers {
    pub group: MetricGroup,
    /// Flagged rows, in dataset order
    pub rows: Vec<Record>,
    /// Every field over the threshold, row-major
    pub hits: Vec<OutlierHit>,
}

impl GroupOutliers {
    pub fn sequences(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.sequence).collect()
    }
}

/// Outlier stage findings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    /// One entry per metric group, in `MetricGroup::ALL` order
    pub groups: Vec<GroupOutliers>,
    pub coercion_warnings: Vec<CoercionWarning>,
}

impl OutlierReport {
    pub fn group(&self, group: MetricGroup) -> Option<&GroupOutliers> {
        self.groups.iter().find(|g| g.group == group)
    }

    /// Distinct rows flagged by at least one group
    pub fn flagged_rows(&self) -> usize {
        let mut seen: Vec<usize> = self.groups.iter().flat_map(|g| g.sequences()).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

/// Z-score outlier detector
pub struct OutlierDetector {
    config: OutlierConfig,
}

impl OutlierDetector {
    /// Create a new detector with given config
    pub fn new(config: OutlierConfig) -> Self {
        Self { config }
    }

    /// Parse a cell, recording a warning when it is not a finite number
    fn coerce(
        &self,
        record: &Record,
        column: &str,
        idx: usize,
        warnings: &mut Vec<CoercionWarning>,
    ) -> f64 {
        let raw = &record.values[idx];
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                warn!(
                    "Row {}: {} value {:?} is not numeric",
                    record.sheet_row(),
                    column,
                    raw
                );
                warnings.push(CoercionWarning {
                    sequence: record.sequence,
                    column: column.to_string(),
                    raw: raw.clone(),
                });
                f64::NAN
            }
        }
    }

    /// Score every group over a read-only dataset
    pub fn detect(&self, dataset: &Dataset) -> Result<OutlierReport, ValidationError> {
        let mut report = OutlierReport::default();

        for group in MetricGroup::ALL {
            let mut flagged = vec![false; dataset.len()];
            let mut hits: Vec<(usize, OutlierHit)> = Vec::new();

            for &column in group.columns() {
                let idx = dataset.require_column(column)?;
                let values: Vec<f64> = dataset
                    .records()
                    .iter()
                    .map(|r| self.coerce(r, column, idx, &mut report.coercion_warnings))
                    .collect();

                let scores = z_scores(
                    &values,
                    self.config.method,
                    self.config.deviation,
                    self.config.min_samples,
                );

                for (pos, (&value, &z)) in values.iter().zip(&scores).enumerate() {
                    if z.abs() > self.config.threshold {
                        let record = &dataset.records()[pos];
                        debug!(
                            "Row {}: {} = {} has z-score {:.2}",
                            record.sheet_row(),
                            column,
                            value,
                            z
                        );
                        flagged[pos] = true;
                        hits.push((
                            pos,
                            OutlierHit {
                                sequence: record.sequence,
                                column: column.to_string(),
                                value,
                                z_score: z,
                            },
                        ));
                    }
                }
            }

            hits.sort_by_key(|(pos, _)| *pos);
            let rows: Vec<Record> = dataset
                .records()
                .iter()
                .zip(&flagged)
                .filter(|(_, f)| **f)
                .map(|(r, _)| r.clone())
                .collect();

            info!("Outlier check [{}]: {} rows flagged", group, rows.len());
            report.groups.push(GroupOutliers {
                group,
                rows,
                hits: hits.into_iter().map(|(_, h)| h).collect(),
            });
        }

        Ok(report)
    }
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new(OutlierConfig::default())
    }
}
