//! Regression metrics
//!
//! All pipeline metrics are computed on inverse-scaled, price-unit values.
//! Computing them on scaled values and reporting price-unit errors would be
//! a correctness violation, so the report type is built from the
//! reconstructed series the pipeline hands it.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Mean squared error
pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    let n = y_true.len();
    if n == 0 {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n as f64
}

/// Root mean squared error
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mse(y_true, y_pred).sqrt()
}

/// Mean absolute error
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    let n = y_true.len();
    if n == 0 {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n as f64
}

/// Mean absolute percentage error (skips zero targets)
pub fn mape(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    let n = y_true.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, _)| **t != 0.0)
        .map(|(t, p)| ((t - p) / t).abs())
        .sum();
    sum / n as f64 * 100.0
}

/// Coefficient of determination
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    let n = y_true.len();
    if n == 0 {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / n as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Fraction of steps where prediction and target move in the same direction
pub fn directional_accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.len() < 2 || y_true.len() != y_pred.len() {
        return 0.0;
    }
    let n = y_true.len() - 1;
    let correct = (1..y_true.len())
        .filter(|&i| (y_true[i] > y_true[i - 1]) == (y_pred[i] > y_pred[i - 1]))
        .count();
    correct as f64 / n as f64
}

/// Error metrics for one model on one evaluation set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mape: f64,
    pub r2: f64,
    pub directional_accuracy: f64,
}

impl RegressionReport {
    /// Compute all metrics, rejecting misaligned or empty inputs
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self, PipelineError> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::Alignment {
                left: y_true.len(),
                right: y_pred.len(),
                context: "metric computation".to_string(),
            });
        }
        if y_true.is_empty() {
            return Err(PipelineError::DataInsufficiency {
                needed: 1,
                got: 0,
                context: "metric computation".to_string(),
            });
        }

        Ok(Self {
            mse: mse(y_true, y_pred),
            rmse: rmse(y_true, y_pred),
            mae: mae(y_true, y_pred),
            mape: mape(y_true, y_pred),
            r2: r2_score(y_true, y_pred),
            directional_accuracy: directional_accuracy(y_true, y_pred),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_and_rmse() {
        let y_true = [1.0, 2.0, 3.0];
        let y_pred = [1.0, 2.0, 5.0];
        assert!((mse(&y_true, &y_pred) - 4.0 / 3.0).abs() < 1e-12);
        assert!((rmse(&y_true, &y_pred) - (4.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_mae() {
        let y_true = [1.0, 2.0, 3.0];
        let y_pred = [2.0, 2.0, 1.0];
        assert!((mae(&y_true, &y_pred) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_prediction_r2_is_one() {
        let y = [1.0, 2.0, 3.0, 4.0];
        assert!((r2_score(&y, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_prediction_r2_is_zero() {
        let y_true = [1.0, 2.0, 3.0, 4.0];
        let y_pred = [2.5; 4];
        assert!(r2_score(&y_true, &y_pred).abs() < 1e-12);
    }

    #[test]
    fn test_directional_accuracy() {
        let y_true = [1.0, 2.0, 1.5, 2.5];
        let y_pred = [1.0, 1.8, 1.2, 2.0];
        assert!((directional_accuracy(&y_true, &y_pred) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_report_rejects_misalignment() {
        assert!(matches!(
            RegressionReport::compute(&[1.0, 2.0], &[1.0]),
            Err(PipelineError::Alignment { .. })
        ));
    }

    #[test]
    fn test_report_rejects_empty() {
        assert!(RegressionReport::compute(&[], &[]).is_err());
    }
}
