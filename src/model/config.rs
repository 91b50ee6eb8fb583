//! Model hyperparameters, search space and training options

use crate::error::PipelineError;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Hyperparameters for a recurrent forecaster variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentHyperparams {
    /// Number of stacked recurrent layers
    pub num_layers: usize,
    /// Hidden state size per layer
    pub hidden_units: usize,
    /// Dropout rate applied to the encoded features during readout training
    pub dropout: f64,
}

impl RecurrentHyperparams {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.num_layers == 0 {
            return Err(PipelineError::TrainingConfiguration(
                "num_layers must be at least 1".to_string(),
            ));
        }
        if self.hidden_units == 0 {
            return Err(PipelineError::TrainingConfiguration(
                "hidden_units must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(PipelineError::TrainingConfiguration(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

/// Discrete/continuous search space for the recurrent variants.
///
/// Consumed by [`random_search`](crate::model::random_search); the search
/// draws `max_trials` samples and keeps the best validation loss. Bounded
/// budget, best-effort, not guaranteed optimal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSpace {
    /// Candidate layer counts
    pub num_layers: Vec<usize>,
    /// Candidate hidden sizes
    pub hidden_units: Vec<usize>,
    /// Dropout sampled uniformly from this closed range
    pub dropout_range: (f64, f64),
    /// Trial budget
    pub max_trials: usize,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            num_layers: vec![1, 2],
            hidden_units: vec![32, 64, 96, 128],
            dropout_range: (0.2, 0.5),
            max_trials: 10,
        }
    }
}

impl SearchSpace {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.num_layers.is_empty() || self.hidden_units.is_empty() {
            return Err(PipelineError::TrainingConfiguration(
                "search space must list at least one layer count and hidden size".to_string(),
            ));
        }
        let (lo, hi) = self.dropout_range;
        if !(0.0..1.0).contains(&lo) || !(0.0..1.0).contains(&hi) || lo > hi {
            return Err(PipelineError::TrainingConfiguration(format!(
                "dropout range [{}, {}] must lie within [0, 1)",
                lo, hi
            )));
        }
        if self.max_trials == 0 {
            return Err(PipelineError::TrainingConfiguration(
                "max_trials must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Draw one hyperparameter combination
    pub fn sample(&self, rng: &mut StdRng) -> RecurrentHyperparams {
        let num_layers = self.num_layers[rng.gen_range(0..self.num_layers.len())];
        let hidden_units = self.hidden_units[rng.gen_range(0..self.hidden_units.len())];
        let (lo, hi) = self.dropout_range;
        let dropout = if hi > lo { rng.gen_range(lo..hi) } else { lo };
        RecurrentHyperparams {
            num_layers,
            hidden_units,
            dropout,
        }
    }
}

/// Options shared by every forecaster's training loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOptions {
    /// Maximum number of epochs
    pub epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Learning rate for the readout head
    pub learning_rate: f64,
    /// Early stopping: epochs without validation improvement before stopping
    pub patience: usize,
    /// Gradient norm clip
    pub gradient_clip: Option<f64>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            epochs: 30,
            batch_size: 32,
            learning_rate: 0.05,
            patience: 5,
            gradient_clip: Some(1.0),
        }
    }
}

impl TrainingOptions {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(PipelineError::TrainingConfiguration(
                "epochs and batch_size must be positive".to_string(),
            ));
        }
        if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
            return Err(PipelineError::TrainingConfiguration(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if let Some(clip) = self.gradient_clip {
            if clip <= 0.0 {
                return Err(PipelineError::TrainingConfiguration(format!(
                    "gradient_clip must be positive, got {}",
                    clip
                )));
            }
        }
        Ok(())
    }
}
