//! Rolling technical indicator primitives
//!
//! All functions return a vector aligned with the input, with NaN where the
//! rolling window does not yet have full history.

/// Simple moving average over `period` values
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    for i in (period - 1)..values.len() {
        let sum: f64 = values[i + 1 - period..=i].iter().sum();
        result[i] = sum / period as f64;
    }
    result
}

/// Rolling sample standard deviation (ddof = 1) over `period` values
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period < 2 || values.len() < period {
        return result;
    }

    for i in (period - 1)..values.len() {
        let slice = &values[i + 1 - period..=i];
        let mean: f64 = slice.iter().sum::<f64>() / period as f64;
        let variance: f64 =
            slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
        result[i] = variance.sqrt();
    }
    result
}

/// Relative Strength Index over `period` values
///
/// Gains and losses are averaged with simple rolling means; the loss
/// denominator carries a small constant so an all-gain window maps to a
/// value near 100 instead of dividing by zero.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    for i in period..n {
        let avg_gain: f64 = gains[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
        let avg_loss: f64 = losses[i + 1 - period..=i].iter().sum::<f64>() / period as f64;

        let rs = avg_gain / (avg_loss + 1e-8);
        result[i] = 100.0 - 100.0 / (1.0 + rs);
    }
    result
}
