//! Sequence forecasters and hyperparameter search
//!
//! Three learned variants (LSTM, GRU, causal CNN) plus the persistence
//! baseline. All learned variants share the same contract: encode a window
//! with frozen random weights, train a linear readout with early stopping,
//! and emit one scaled next-step close per window.

mod baseline;
mod cnn;
mod config;
mod gru;
mod layers;
mod lstm;
mod search;
mod training;

pub use baseline::PersistenceBaseline;
pub use cnn::ConvForecaster;
pub use config::{RecurrentHyperparams, SearchSpace, TrainingOptions};
pub use gru::{GruCell, GruForecaster};
pub use layers::{Activation, Dense};
pub use lstm::{LstmCell, LstmForecaster};
pub use search::{random_search, SearchOutcome, TrialRecord};
pub use training::FitSummary;

use crate::error::PipelineError;
use crate::preprocessing::WindowSet;
use ndarray::Array1;

/// A trainable next-step forecaster
pub trait Forecaster {
    /// Short display name ("lstm", "gru", "cnn")
    fn name(&self) -> &'static str;

    /// Train on the given windows, early-stopping on the validation slice.
    ///
    /// Fails with [`PipelineError::TrainingConfiguration`] on an empty
    /// training set or a window shape that does not match the model,
    /// before any fitting happens.
    fn fit(
        &mut self,
        train: &WindowSet,
        validation: &WindowSet,
        opts: &TrainingOptions,
    ) -> Result<FitSummary, PipelineError>;

    /// Predict one scaled close per window
    fn predict(&self, windows: &WindowSet) -> Array1<f64>;
}
