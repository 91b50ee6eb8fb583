//! Error taxonomy for the forecasting pipeline
//!
//! Every stage propagates its failures to the orchestrating caller; nothing
//! is retried inside the pipeline.

use thiserror::Error;

/// Errors surfaced by the pipeline stages
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Fewer rows than a rolling window or a non-empty split requires
    #[error("insufficient data for {context}: needed {needed} rows, got {got}")]
    DataInsufficiency {
        needed: usize,
        got: usize,
        context: String,
    },

    /// A value fell outside the fitted min/max range under the strict policy
    #[error("value {value} for feature '{feature}' outside fitted range [{min}, {max}]")]
    ScaleRange {
        feature: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Parallel sequences fed to the aggregator or evaluator disagree in length
    #[error("misaligned sequences in {context}: {left} vs {right}")]
    Alignment {
        left: usize,
        right: usize,
        context: String,
    },

    /// Malformed hyperparameter bounds or an empty training set,
    /// detected before any model fit is attempted
    #[error("invalid training configuration: {0}")]
    TrainingConfiguration(String),

    /// Malformed input data (unsorted dates, duplicates, unparseable rows)
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
