//! Confidence bands around the ensemble prediction
//!
//! The band width comes from genuine variability: the per-step sample
//! standard deviation across the member models, combined in quadrature with
//! the ensemble's validation-residual standard deviation. Replicating a
//! fixed prediction and taking its (zero) standard deviation is exactly the
//! degenerate construction this module exists to avoid.

use crate::error::PipelineError;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Symmetric confidence band aligned with a prediction sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl ConfidenceBand {
    /// Number of steps in the band
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// True if the band covers no steps
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Band width at one step
    pub fn width(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }

    /// True if `value` lies inside the band at step `i`
    pub fn covers(&self, i: usize, value: f64) -> bool {
        value >= self.lower[i] && value <= self.upper[i]
    }

    /// Fraction of `values` covered by the band
    pub fn coverage(&self, values: &[f64]) -> f64 {
        if values.is_empty() || values.len() != self.len() {
            return 0.0;
        }
        let covered = values
            .iter()
            .enumerate()
            .filter(|(i, &v)| self.covers(*i, v))
            .count();
        covered as f64 / values.len() as f64
    }
}

/// Normal-approximation band estimator
#[derive(Debug, Clone)]
pub struct UncertaintyEstimator {
    z: f64,
    residual_std: f64,
}

impl UncertaintyEstimator {
    /// Estimator for a two-sided confidence level, e.g. 0.95
    pub fn new(confidence: f64) -> Result<Self, PipelineError> {
        if !(0.0..1.0).contains(&confidence) || confidence == 0.0 {
            return Err(PipelineError::TrainingConfiguration(format!(
                "confidence must be in (0, 1), got {}",
                confidence
            )));
        }
        let normal = Normal::new(0.0, 1.0).expect("standard normal");
        let z = normal.inverse_cdf(1.0 - (1.0 - confidence) / 2.0);
        Ok(Self {
            z,
            residual_std: 0.0,
        })
    }

    /// Add a residual-based variability floor (standard deviation of the
    /// ensemble's validation residuals, in the same scaled units as the
    /// predictions)
    pub fn with_residual_std(mut self, residual_std: f64) -> Self {
        self.residual_std = residual_std.max(0.0);
        self
    }

    /// The z-score in use
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Build a band from the aligned member predictions.
    ///
    /// At each step the deviation is
    /// `sqrt(inter-model sample variance + residual_std^2)`, scaled by z.
    pub fn band(&self, members: &[Array1<f64>]) -> Result<ConfidenceBand, PipelineError> {
        if members.len() < 2 {
            return Err(PipelineError::TrainingConfiguration(
                "uncertainty needs at least two member models".to_string(),
            ));
        }
        let n = members[0].len();
        for m in members.iter().skip(1) {
            if m.len() != n {
                return Err(PipelineError::Alignment {
                    left: n,
                    right: m.len(),
                    context: "uncertainty member predictions".to_string(),
                });
            }
        }

        let k = members.len() as f64;
        let mut mean = Vec::with_capacity(n);
        let mut lower = Vec::with_capacity(n);
        let mut upper = Vec::with_capacity(n);

        for i in 0..n {
            let step_mean = members.iter().map(|m| m[i]).sum::<f64>() / k;
            let spread_var = members
                .iter()
                .map(|m| (m[i] - step_mean).powi(2))
                .sum::<f64>()
                / (k - 1.0);
            let sigma = (spread_var + self.residual_std * self.residual_std).sqrt();

            mean.push(step_mean);
            lower.push(step_mean - self.z * sigma);
            upper.push(step_mean + self.z * sigma);
        }

        Ok(ConfidenceBand { mean, lower, upper })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_z_score_for_95() {
        let est = UncertaintyEstimator::new(0.95).unwrap();
        assert!((est.z() - 1.96).abs() < 0.01);
    }

    #[test]
    fn test_band_strictly_positive_width_on_disagreement() {
        let est = UncertaintyEstimator::new(0.95).unwrap();
        let members = [array![0.5, 0.6], array![0.52, 0.58], array![0.48, 0.63]];
        let band = est.band(&members).unwrap();

        for i in 0..band.len() {
            assert!(band.upper[i] > band.lower[i]);
            assert!(band.width(i) > 0.0);
        }
    }

    #[test]
    fn test_band_centered_on_member_mean() {
        let est = UncertaintyEstimator::new(0.95).unwrap();
        let members = [array![0.3], array![0.5], array![0.7]];
        let band = est.band(&members).unwrap();
        assert!((band.mean[0] - 0.5).abs() < 1e-12);
        assert!((band.upper[0] - band.mean[0] - (band.mean[0] - band.lower[0])).abs() < 1e-12);
    }

    #[test]
    fn test_residual_floor_keeps_band_open_under_agreement() {
        let est = UncertaintyEstimator::new(0.95)
            .unwrap()
            .with_residual_std(0.02);
        let p = array![0.5, 0.5];
        let band = est.band(&[p.clone(), p.clone(), p]).unwrap();
        for i in 0..band.len() {
            assert!(band.width(i) > 0.0);
        }
    }

    #[test]
    fn test_band_width_never_negative() {
        let est = UncertaintyEstimator::new(0.95).unwrap();
        let p = array![0.4, 0.4, 0.4];
        let band = est.band(&[p.clone(), p.clone(), p]).unwrap();
        for i in 0..band.len() {
            assert!(band.width(i) >= 0.0);
        }
    }

    #[test]
    fn test_misaligned_members_rejected() {
        let est = UncertaintyEstimator::new(0.95).unwrap();
        let a = array![0.1, 0.2];
        let b = array![0.1];
        assert!(matches!(
            est.band(&[a, b]),
            Err(PipelineError::Alignment { .. })
        ));
    }

    #[test]
    fn test_coverage() {
        let band = ConfidenceBand {
            mean: vec![0.5, 0.5],
            lower: vec![0.4, 0.4],
            upper: vec![0.6, 0.6],
        };
        assert!((band.coverage(&[0.45, 0.9]) - 0.5).abs() < 1e-12);
    }
}
