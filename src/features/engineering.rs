//! Feature engineering for the forecasting pipeline
//!
//! Derives the model's five-column feature set from a raw instrument series:
//! close, RSI, short and long moving averages, and rolling volatility.
//! Rows without full rolling history are dropped, never imputed.

use crate::data::InstrumentSeries;
use crate::error::PipelineError;
use crate::features::indicators::{rolling_std, rsi, sma};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Names of the engineered feature columns, in matrix order
pub const FEATURE_NAMES: [&str; 5] = ["close", "rsi", "ma_short", "ma_long", "volatility"];

/// Column index of the close price in the feature matrix
pub const CLOSE_COLUMN: usize = 0;

/// One engineered per-date record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Date the row belongs to
    pub date: NaiveDate,
    /// Closing price
    pub close: f64,
    /// Momentum oscillator (0-100)
    pub rsi: f64,
    /// Short moving average of close
    pub ma_short: f64,
    /// Long moving average of close
    pub ma_long: f64,
    /// Rolling standard deviation of close
    pub volatility: f64,
}

impl FeatureRow {
    /// Number of feature columns
    pub const NUM_FEATURES: usize = FEATURE_NAMES.len();

    /// Values in matrix column order
    pub fn values(&self) -> [f64; Self::NUM_FEATURES] {
        [self.close, self.rsi, self.ma_short, self.ma_long, self.volatility]
    }
}

/// Rolling-window periods for the engineered features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// RSI period
    pub rsi_period: usize,
    /// Short moving-average period
    pub short_ma_period: usize,
    /// Long moving-average period
    pub long_ma_period: usize,
    /// Rolling-volatility period
    pub volatility_period: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            short_ma_period: 7,
            long_ma_period: 30,
            volatility_period: 7,
        }
    }
}

impl FeatureConfig {
    /// Longest rolling window any feature needs
    pub fn longest_period(&self) -> usize {
        self.rsi_period
            .max(self.short_ma_period)
            .max(self.long_ma_period)
            .max(self.volatility_period)
    }
}

/// Derives [`FeatureRow`]s from an instrument series
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    /// Engineer with the default periods (14/7/30/7)
    pub fn new() -> Self {
        Self::default()
    }

    /// Engineer with custom periods
    pub fn with_config(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// The configured periods
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Build feature rows for one instrument.
    ///
    /// Deterministic given the input series. Rows where any rolling value is
    /// still NaN (insufficient history) are discarded, so the output starts
    /// `longest_period - 1` rows into the series. Fails if the series is too
    /// short to yield a single complete row.
    pub fn build_rows(&self, series: &InstrumentSeries) -> Result<Vec<FeatureRow>, PipelineError> {
        let needed = self.config.longest_period();
        if series.len() < needed {
            return Err(PipelineError::DataInsufficiency {
                needed,
                got: series.len(),
                context: format!("feature engineering for {}", series.symbol),
            });
        }

        let closes = series.closes();
        let rsi_values = rsi(&closes, self.config.rsi_period);
        let ma_short = sma(&closes, self.config.short_ma_period);
        let ma_long = sma(&closes, self.config.long_ma_period);
        let volatility = rolling_std(&closes, self.config.volatility_period);

        let mut rows = Vec::with_capacity(series.len());
        for (i, bar) in series.bars.iter().enumerate() {
            let row = FeatureRow {
                date: bar.date,
                close: bar.close,
                rsi: rsi_values[i],
                ma_short: ma_short[i],
                ma_long: ma_long[i],
                volatility: volatility[i],
            };
            if row.values().iter().all(|v| v.is_finite()) {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(PipelineError::DataInsufficiency {
                needed,
                got: series.len(),
                context: format!("no complete feature rows for {}", series.symbol),
            });
        }

        Ok(rows)
    }
}
