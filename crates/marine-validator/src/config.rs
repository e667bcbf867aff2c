//! Pipeline Configuration

use serde::{Deserialize, Serialize};

/// Missing-value detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingValueConfig {
    /// Values treated as logically absent
    pub null_tokens: Vec<String>,
    /// Match tokens ignoring ASCII case ("NAN", "Nan", ...)
    pub case_insensitive: bool,
    /// Trim surrounding whitespace before matching
    pub trim_whitespace: bool,
}

impl Default for MissingValueConfig {
    fn default() -> Self {
        Self {
            null_tokens: vec!["nan".to_string(), "NaN".to_string(), String::new()],
            case_insensitive: true,
            trim_whitespace: true,
        }
    }
}

/// How a value's Z-score baseline is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZScoreMethod {
    /// Score each value against the other values of its column
    ///
    /// When the other values are all equal, any value that differs from them
    /// scores ±∞ and is flagged whatever the threshold. `[1.0, 1.0, 1.0, 1.1]`
    /// flags the last reading here, where `Column` gives it √3. Coarsely
    /// quantized or mostly constant columns flag readily under this method.
    LeaveOneOut,
    /// Score each value against the whole column, itself included
    Column,
}

/// Standard deviation estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deviation {
    /// Divide by n
    Population,
    /// Divide by n - 1
    Sample,
}

/// Outlier detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// A row is flagged when any |Z| in its group exceeds this
    pub threshold: f64,
    /// Baseline selection
    pub method: ZScoreMethod,
    /// Deviation estimator
    pub deviation: Deviation,
    /// Columns with fewer finite values are never scored
    pub min_samples: usize,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            method: ZScoreMethod::LeaveOneOut,
            deviation: Deviation::Population,
            min_samples: 3,
        }
    }
}

/// What a pattern-conforming timestamp still has to satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// Digit positions and literals only; month 13 passes
    FormatOnly,
    /// Must also be a real calendar date and time of day
    Calendar,
}

/// Timestamp normalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    pub policy: TimestampPolicy,
    /// chrono format used for surviving timestamps
    pub display_format: String,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            policy: TimestampPolicy::FormatOnly,
            display_format: "%d-%m-%YT%H:%M:%S".to_string(),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub missing: MissingValueConfig,
    pub outlier: OutlierConfig,
    pub timestamp: TimestampConfig,
}

impl PipelineConfig {
    /// Calendar-checked timestamps and a tighter outlier threshold
    pub fn strict() -> Self {
        Self {
            outlier: OutlierConfig {
                threshold: 2.5,
                ..Default::default()
            },
            timestamp: TimestampConfig {
                policy: TimestampPolicy::Calendar,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Looser outlier threshold, exact-match null tokens
    pub fn lenient() -> Self {
        Self {
            missing: MissingValueConfig {
                case_insensitive: false,
                ..Default::default()
            },
            outlier: OutlierConfig {
                threshold: 4.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.outlier.threshold, 3.0);
        assert_eq!(config.outlier.deviation, Deviation::Population);
        assert_eq!(config.timestamp.policy, TimestampPolicy::FormatOnly);
        assert!(config.missing.null_tokens.contains(&String::new()));
    }

    #[test]
    fn test_presets() {
        assert_eq!(PipelineConfig::strict().timestamp.policy, TimestampPolicy::Calendar);
        assert!(PipelineConfig::lenient().outlier.threshold > 3.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"outlier": {"method": "column"}}"#).unwrap();
        assert_eq!(config.outlier.method, ZScoreMethod::Column);
        assert_eq!(config.outlier.threshold, 3.0);
        assert_eq!(config.timestamp, TimestampConfig::default());
    }
}
