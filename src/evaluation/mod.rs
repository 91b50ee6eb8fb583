//! Error metrics and paired significance tests

mod metrics;
mod stats;

pub use metrics::{
    directional_accuracy, mae, mape, mse, r2_score, rmse, RegressionReport,
};
pub use stats::{paired_t_test, PairedTTest};
