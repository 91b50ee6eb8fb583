//! Persistence baseline
//!
//! Predicts "tomorrow equals today": the scaled close at the last row of
//! each window. Zero parameters, no training. Any learned model that cannot
//! beat this on a held-out set points at a training or leakage defect.

use crate::preprocessing::WindowSet;
use ndarray::Array1;

/// Naive persistence forecaster
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistenceBaseline;

impl PersistenceBaseline {
    pub fn new() -> Self {
        Self
    }

    /// Predict the last observed scaled close for every window
    pub fn predict(&self, windows: &WindowSet) -> Array1<f64> {
        windows.last_closes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::make_windows;
    use chrono::NaiveDate;
    use ndarray::Array2;

    fn dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| {
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i as i64)
            })
            .collect()
    }

    #[test]
    fn test_prediction_is_last_window_close() {
        let matrix = Array2::from_shape_fn((30, 5), |(i, j)| i as f64 * 10.0 + j as f64);
        let ws = make_windows(&matrix, &dates(30), 7).unwrap();
        let preds = PersistenceBaseline::new().predict(&ws);

        for i in 0..ws.len() {
            // Last row of window i is row i + 6; close is column 0
            assert!((preds[i] - (i as f64 + 6.0) * 10.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_mae_equals_mean_absolute_first_difference() {
        // Zero-drift series: baseline error at each step is exactly the
        // absolute first difference of the series
        let closes: Vec<f64> = (0..40).map(|i| ((i as f64 * 0.9).sin() + 1.0) / 2.0).collect();
        let matrix = Array2::from_shape_fn((40, 5), |(i, j)| {
            if j == 0 {
                closes[i]
            } else {
                0.5
            }
        });
        let ws = make_windows(&matrix, &dates(40), 5).unwrap();
        let preds = PersistenceBaseline::new().predict(&ws);

        let mae = preds
            .iter()
            .zip(ws.y.iter())
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / ws.len() as f64;

        // Mean |close[i+5] - close[i+4]| over the window positions
        let expected = (0..ws.len())
            .map(|i| (closes[i + 5] - closes[i + 4]).abs())
            .sum::<f64>()
            / ws.len() as f64;

        assert!((mae - expected).abs() < 1e-12);
    }
}
