//! Technical indicators and feature engineering

mod engineering;
pub mod indicators;

pub use engineering::{FeatureConfig, FeatureEngineer, FeatureRow, CLOSE_COLUMN, FEATURE_NAMES};
