//! Column Statistics and Z-Scores

use crate::config::{Deviation, ZScoreMethod};

/// Deviations at or below this are treated as zero
const ZERO_DEVIATION: f64 = 1e-12;

/// A leave-one-out remainder whose squared spread is at most this share of
/// its second moment about the column mean is constant up to rounding
const CANCELLATION: f64 = 1e-10;

/// Summary of the finite values in one column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStatistics {
    /// Number of finite values
    pub count: usize,
    /// Mean of finite values
    pub mean: f64,
    /// Standard deviation of finite values
    pub std_dev: f64,
    /// Minimum finite value
    pub min: f64,
    /// Maximum finite value
    pub max: f64,
}

impl ColumnStatistics {
    /// Compute statistics, skipping NaN and infinite entries
    pub fn compute(values: &[f64], deviation: Deviation) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::default();
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let min = finite.iter().cloned().fold(f64::MAX, f64::min);
        let max = finite.iter().cloned().fold(f64::MIN, f64::max);

        let m2: f64 = finite.iter().map(|v| (v - mean) * (v - mean)).sum();
        let std_dev = match divisor(finite.len(), deviation) {
            Some(d) => (m2 / d).sqrt(),
            None => 0.0,
        };

        Self {
            count: finite.len(),
            mean,
            std_dev,
            min,
            max,
        }
    }
}

/// Denominator for the variance, `None` when too few values
fn divisor(count: usize, deviation: Deviation) -> Option<f64> {
    match deviation {
        Deviation::Population if count >= 1 => Some(count as f64),
        Deviation::Sample if count >= 2 => Some((count - 1) as f64),
        _ => None,
    }
}

/// Z-score of every entry of a column
///
/// Non-finite entries score NaN. Columns with fewer than `min_samples` finite
/// values score 0 throughout.
pub fn z_scores(
    values: &[f64],
    method: ZScoreMethod,
    deviation: Deviation,
    min_samples: usize,
) -> Vec<f64> {
    let stats = ColumnStatistics::compute(values, deviation);
    if stats.count < min_samples.max(1) {
        return values
            .iter()
            .map(|v| if v.is_finite() { 0.0 } else { f64::NAN })
            .collect();
    }

    match method {
        ZScoreMethod::Column => values
            .iter()
            .map(|&v| {
                if !v.is_finite() {
                    f64::NAN
                } else if stats.std_dev <= ZERO_DEVIATION {
                    0.0
                } else {
                    (v - stats.mean) / stats.std_dev
                }
            })
            .collect(),
        ZScoreMethod::LeaveOneOut => leave_one_out(values, &stats, deviation),
    }
}

/// Score each value against the remaining finite values
///
/// Works on deviations from the full-column mean so the running sums stay
/// well conditioned for large magnitudes such as pressure in hPa.
fn leave_one_out(values: &[f64], stats: &ColumnStatistics, deviation: Deviation) -> Vec<f64> {
    let rest = stats.count - 1;
    let Some(rest_divisor) = divisor(rest, deviation) else {
        return values.iter().map(|_| 0.0).collect();
    };

    let shifted: Vec<f64> = values.iter().map(|v| v - stats.mean).collect();
    let sum: f64 = shifted.iter().filter(|d| d.is_finite()).sum();
    let sum_sq: f64 = shifted.iter().filter(|d| d.is_finite()).map(|d| d * d).sum();

    shifted
        .iter()
        .map(|&d| {
            if !d.is_finite() {
                return f64::NAN;
            }
            let rest_mean = (sum - d) / rest as f64;
            let rest_sq = (sum_sq - d * d).max(0.0);
            let rest_m2 = (rest_sq - rest as f64 * rest_mean * rest_mean).max(0.0);
            let rest_std = (rest_m2 / rest_divisor).sqrt();
            let gap = d - rest_mean;

            if rest_m2 <= CANCELLATION * rest_sq {
                if gap.abs() <= ZERO_DEVIATION * (1.0 + stats.mean.abs()) {
                    0.0
                } else {
                    gap.signum() * f64::INFINITY
                }
            } else {
                gap / rest_std
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_computation() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = ColumnStatistics::compute(&values, Deviation::Population);
        assert!((stats.mean - 3.0).abs() < 0.001);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
    }

    #[test]
    fn test_std_dev_computation() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let population = ColumnStatistics::compute(&values, Deviation::Population);
        assert!((population.std_dev - 2.0).abs() < 1e-9);
        let sample = ColumnStatistics::compute(&values, Deviation::Sample);
        assert!((sample.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_nan_entries_skipped() {
        let values = vec![1.0, f64::NAN, 3.0, f64::INFINITY];
        let stats = ColumnStatistics::compute(&values, Deviation::Population);
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_values() {
        let stats = ColumnStatistics::compute(&[], Deviation::Population);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
    }

    #[test]
    fn test_column_zero_deviation_scores_zero() {
        let z = z_scores(&[5.0; 4], ZScoreMethod::Column, Deviation::Population, 3);
        assert!(z.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_leave_one_out_zero_deviation_scores_zero() {
        let z = z_scores(&[5.0; 4], ZScoreMethod::LeaveOneOut, Deviation::Population, 3);
        assert!(z.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_column_method_cannot_reach_three_on_four_values() {
        let z = z_scores(
            &[10.0, 10.0, 10.0, 100.0],
            ZScoreMethod::Column,
            Deviation::Population,
            3,
        );
        assert!((z[3] - 3f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_leave_one_out_isolates_spike() {
        let z = z_scores(
            &[10.0, 10.0, 10.0, 100.0],
            ZScoreMethod::LeaveOneOut,
            Deviation::Population,
            3,
        );
        assert!(z[3].is_infinite() && z[3] > 0.0);
        assert!(z[..3].iter().all(|s| s.abs() < 1.0));
    }

    #[test]
    fn test_leave_one_out_step_on_constant_column_is_unbounded() {
        let values = [1.0, 1.0, 1.0, 1.1];
        let loo = z_scores(&values, ZScoreMethod::LeaveOneOut, Deviation::Population, 3);
        assert_eq!(loo[3], f64::INFINITY);
        assert!(loo[..3].iter().all(|s| s.is_finite() && s.abs() < 1.0));

        let column = z_scores(&values, ZScoreMethod::Column, Deviation::Population, 3);
        assert!((column[3] - 3f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_leave_one_out_constant_inexact_column_scores_zero() {
        let z = z_scores(&[0.1; 5], ZScoreMethod::LeaveOneOut, Deviation::Population, 3);
        assert!(z.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_leave_one_out_matches_direct_computation() {
        let values = [1013.2, 1012.8, 1014.1, 1009.5, 1013.0];
        let z = z_scores(&values, ZScoreMethod::LeaveOneOut, Deviation::Population, 3);

        for (i, score) in z.iter().enumerate() {
            let rest: Vec<f64> = values
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, v)| *v)
                .collect();
            let stats = ColumnStatistics::compute(&rest, Deviation::Population);
            let expected = (values[i] - stats.mean) / stats.std_dev;
            assert!((score - expected).abs() < 1e-6, "row {i}: {score} vs {expected}");
        }
    }

    #[test]
    fn test_non_finite_entries_score_nan() {
        let z = z_scores(
            &[1.0, f64::NAN, 2.0, 3.0],
            ZScoreMethod::LeaveOneOut,
            Deviation::Population,
            3,
        );
        assert!(z[1].is_nan());
        assert!(z[0].is_finite());
    }

    #[test]
    fn test_below_min_samples_scores_zero() {
        let z = z_scores(&[1.0, 100.0], ZScoreMethod::LeaveOneOut, Deviation::Population, 3);
        assert_eq!(z, vec![0.0, 0.0]);
    }
}
