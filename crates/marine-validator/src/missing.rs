//! Missing-Value Validator

use crate::config::MissingValueConfig;
use crate::outcome::StageOutcome;
use crate::record::Dataset;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Missing cells in one column, counted before any row is dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCount {
    pub column: String,
    pub missing: usize,
}

/// Missing-value stage result
#[derive(Debug, Clone, PartialEq)]
pub struct MissingValueResult {
    pub outcome: StageOutcome,
    /// One entry per column, in column order
    pub counts: Vec<ColumnCount>,
}

impl MissingValueResult {
    pub fn total_missing(&self) -> usize {
        self.counts.iter().map(|c| c.missing).sum()
    }
}

/// Drops rows carrying null-like tokens
pub struct MissingValueValidator {
    config: MissingValueConfig,
    /// Tokens prepared once for the configured matching mode
    tokens: Vec<String>,
}

impl MissingValueValidator {
    /// Create a new validator with given config
    pub fn new(config: MissingValueConfig) -> Self {
        let tokens = config
            .null_tokens
            .iter()
            .map(|t| {
                let t = if config.trim_whitespace { t.trim() } else { t.as_str() };
                if config.case_insensitive {
                    t.to_ascii_lowercase()
                } else {
                    t.to_string()
                }
            })
            .collect();
        Self { config, tokens }
    }

    /// Whether a raw cell is logically absent
    pub fn is_missing(&self, value: &str) -> bool {
        let value = if self.config.trim_whitespace { value.trim() } else { value };
        if self.config.case_insensitive {
            self.tokens.iter().any(|t| t.eq_ignore_ascii_case(value))
        } else {
            self.tokens.iter().any(|t| t == value)
        }
    }

    /// Count missing cells per column, then keep only complete rows
    pub fn validate(&self, dataset: Dataset) -> MissingValueResult {
        let mut missing = vec![0usize; dataset.columns().len()];
        for record in dataset.records() {
            for (count, value) in missing.iter_mut().zip(&record.values) {
                if self.is_missing(value) {
                    *count += 1;
                }
            }
        }

        let counts: Vec<ColumnCount> = dataset
            .columns()
            .iter()
            .zip(&missing)
            .map(|(column, &missing)| ColumnCount {
                column: column.clone(),
                missing,
            })
            .collect();

        let input_rows = dataset.len();
        let outcome = if missing.iter().all(|&m| m == 0) {
            StageOutcome::Clean(dataset)
        } else {
            StageOutcome::partition(dataset, |record| {
                let incomplete = record.values.iter().any(|v| self.is_missing(v));
                if incomplete {
                    debug!("Row {} has missing values", record.sheet_row());
                }
                incomplete
            })
        };

        info!(
            "Missing-value check: {} rows in, {} removed, {} missing cells",
            input_rows,
            outcome.removed_count(),
            missing.iter().sum::<usize>()
        );

        MissingValueResult { outcome, counts }
    }
}

impl Default for MissingValueValidator {
    fn default() -> Self {
        Self::new(MissingValueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::{dataset, row, set};

    fn count_for(result: &MissingValueResult, column: &str) -> usize {
        result
            .counts
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.missing)
            .unwrap()
    }

    #[test]
    fn test_null_tokens() {
        let validator = MissingValueValidator::default();
        assert!(validator.is_missing(""));
        assert!(validator.is_missing("nan"));
        assert!(validator.is_missing("NaN"));
        assert!(validator.is_missing("NAN"));
        assert!(validator.is_missing("  "));
        assert!(!validator.is_missing("0"));
        assert!(!validator.is_missing("banana"));
    }

    #[test]
    fn test_case_sensitive_tokens() {
        let validator = MissingValueValidator::new(MissingValueConfig {
            case_insensitive: false,
            ..Default::default()
        });
        assert!(validator.is_missing("NaN"));
        assert!(!validator.is_missing("NAN"));
    }

    #[test]
    fn test_incomplete_rows_dropped_and_counted_before_removal() {
        let mut r1 = row("2023-01-01T00:00:00Z", "1");
        set(&mut r1, "WindSpeed", "");
        set(&mut r1, "Gust", "nan");
        let mut r3 = row("2023-01-01T02:00:00Z", "1");
        set(&mut r3, "WindSpeed", "NaN");
        let input = dataset(vec![
            row("2023-01-01T00:00:00Z", "1"),
            r1,
            row("2023-01-01T01:00:00Z", "1"),
            r3,
        ]);

        let result = MissingValueValidator::default().validate(input);

        assert_eq!(count_for(&result, "WindSpeed"), 2);
        assert_eq!(count_for(&result, "Gust"), 1);
        assert_eq!(count_for(&result, "time"), 0);
        assert_eq!(result.total_missing(), 3);
        assert_eq!(result.outcome.dataset().sequences(), vec![0, 2]);
        assert_eq!(result.outcome.removed_count(), 2);
    }

    #[test]
    fn test_all_zero_counts_returns_input_unchanged() {
        let input = dataset(vec![row("a", "1"), row("b", "2")]);
        let result = MissingValueValidator::default().validate(input.clone());
        assert!(result.outcome.is_clean());
        assert_eq!(result.outcome.into_dataset(), input);
    }

    #[test]
    fn test_empty_dataset() {
        let result = MissingValueValidator::default().validate(Dataset::empty());
        assert!(result.outcome.dataset().is_empty());
        assert_eq!(result.counts.len(), 11);
        assert!(result.counts.iter().all(|c| c.missing == 0));
    }
}
