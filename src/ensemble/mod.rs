//! Ensemble aggregation
//!
//! Combines the learned forecasters' outputs by elementwise arithmetic
//! mean. All member sequences must be aligned to the same test windows;
//! a length mismatch is a configuration error, never silently truncated.

mod uncertainty;

pub use uncertainty::{ConfidenceBand, UncertaintyEstimator};

use crate::error::PipelineError;
use ndarray::Array1;

/// Elementwise mean of aligned prediction sequences
pub fn combine(predictions: &[Array1<f64>]) -> Result<Array1<f64>, PipelineError> {
    let first = predictions.first().ok_or_else(|| {
        PipelineError::TrainingConfiguration("ensemble needs at least one member".to_string())
    })?;

    for p in predictions.iter().skip(1) {
        if p.len() != first.len() {
            return Err(PipelineError::Alignment {
                left: first.len(),
                right: p.len(),
                context: "ensemble member predictions".to_string(),
            });
        }
    }

    let mut sum = Array1::<f64>::zeros(first.len());
    for p in predictions {
        sum += p;
    }
    Ok(sum / predictions.len() as f64)
}
