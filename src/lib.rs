//! # Ensemble Forecast
//!
//! Stock closing-price forecasting from rolling windows of engineered
//! technical features. Three sequence models (LSTM, GRU, causal CNN) are
//! trained on identical windows, combined into an arithmetic-mean ensemble,
//! wrapped in a normal-approximation confidence band, and compared with
//! paired significance tests, all on inverse-scaled, price-unit values.
//!
//! ## Modules
//!
//! - [`data`] - daily OHLCV panel, CSV loading, synthetic generation
//! - [`features`] - technical indicators and feature engineering
//! - [`preprocessing`] - min-max scaling, windowing, chronological splits
//! - [`model`] - the three forecasters, baseline and hyperparameter search
//! - [`ensemble`] - aggregation and uncertainty bands
//! - [`evaluation`] - error metrics and paired t-tests
//! - [`pipeline`] - end-to-end orchestration
//!
//! ## Example
//!
//! ```rust,no_run
//! use ensemble_forecast::data::random_walk_panel;
//! use ensemble_forecast::pipeline::{run, PipelineConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let panel = random_walk_panel(&["AAPL", "MSFT"], 500, 42)?;
//!     let report = run(panel, &PipelineConfig::default())?;
//!
//!     for inst in &report.instruments {
//!         println!(
//!             "{}: ensemble RMSE {:.2} (baseline {:.2})",
//!             inst.symbol, inst.ensemble.rmse, inst.baseline.rmse
//!         );
//!     }
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod ensemble;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod preprocessing;

pub use data::{load_panel, DailyBar, ImputePolicy, InstrumentSeries, StockPanel};
pub use ensemble::{combine, ConfidenceBand, UncertaintyEstimator};
pub use error::PipelineError;
pub use evaluation::{paired_t_test, PairedTTest, RegressionReport};
pub use features::{FeatureConfig, FeatureEngineer, FeatureRow};
pub use model::{
    ConvForecaster, Forecaster, GruForecaster, LstmForecaster, PersistenceBaseline,
    RecurrentHyperparams, SearchSpace, TrainingOptions,
};
pub use pipeline::{run, InstrumentReport, PipelineConfig, PipelineReport};
pub use preprocessing::{chronological_split, make_windows, MinMaxScaler, RangePolicy, WindowSet};
