//! Core data structures for the daily stock panel
//!
//! A panel is a set of per-instrument series of daily OHLCV bars, sorted by
//! symbol and date. Series are immutable once loaded, except for the
//! documented imputation of missing open/high/low values.

use crate::error::PipelineError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBar {
    /// Trading date
    pub date: NaiveDate,
    /// Opening price (may arrive as NaN and be imputed)
    pub open: f64,
    /// Highest price (may arrive as NaN and be imputed)
    pub high: f64,
    /// Lowest price (may arrive as NaN and be imputed)
    pub low: f64,
    /// Closing price (never imputed)
    pub close: f64,
    /// Trading volume
    pub volume: f64,
}

impl DailyBar {
    /// Create a new bar
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// True if open, high and low are all present (no NaN)
    pub fn is_complete(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite()
    }

    /// Return from open to close in percent
    pub fn return_pct(&self) -> f64 {
        if self.open != 0.0 && self.open.is_finite() {
            (self.close - self.open) / self.open * 100.0
        } else {
            0.0
        }
    }
}

/// Strategy for bars with missing open/high/low values
///
/// `PanelMean` replaces each missing value with the mean of that column over
/// the entire panel (all instruments pooled), matching the upstream dataset's
/// documented cleaning step. `DropIncomplete` removes such bars instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputePolicy {
    PanelMean,
    DropIncomplete,
}

impl Default for ImputePolicy {
    fn default() -> Self {
        ImputePolicy::PanelMean
    }
}

/// Ordered daily series for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSeries {
    /// Instrument symbol, e.g. "AAPL"
    pub symbol: String,
    /// Bars in strictly increasing date order
    pub bars: Vec<DailyBar>,
}

impl InstrumentSeries {
    /// Build a series, validating that dates are strictly increasing
    pub fn new(symbol: String, bars: Vec<DailyBar>) -> Result<Self, PipelineError> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(PipelineError::InvalidData(format!(
                    "{}: dates not strictly increasing at {} -> {}",
                    symbol, pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { symbol, bars })
    }

    /// Number of bars
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// True if the series holds no bars
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Closing prices in date order
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Dates in order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }
}

/// Panel of per-instrument series, sorted by symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPanel {
    pub series: Vec<InstrumentSeries>,
}

impl StockPanel {
    /// Build a panel from per-instrument series, sorted by symbol.
    /// Duplicate symbols are rejected.
    pub fn from_series(mut series: Vec<InstrumentSeries>) -> Result<Self, PipelineError> {
        series.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        for pair in series.windows(2) {
            if pair[0].symbol == pair[1].symbol {
                return Err(PipelineError::InvalidData(format!(
                    "duplicate instrument '{}' in panel",
                    pair[0].symbol
                )));
            }
        }
        Ok(Self { series })
    }

    /// Number of instruments
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True if the panel holds no instruments
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Look up one instrument by symbol
    pub fn get(&self, symbol: &str) -> Option<&InstrumentSeries> {
        self.series.iter().find(|s| s.symbol == symbol)
    }

    /// Total number of bars across all instruments
    pub fn total_bars(&self) -> usize {
        self.series.iter().map(|s| s.bars.len()).sum()
    }

    /// Apply the missing-value policy to open/high/low columns.
    ///
    /// With `PanelMean`, the replacement mean for each column is computed
    /// over every instrument in the panel, not per instrument.
    pub fn impute_missing(&mut self, policy: ImputePolicy) {
        match policy {
            ImputePolicy::PanelMean => {
                let open_mean = self.column_mean(|b| b.open);
                let high_mean = self.column_mean(|b| b.high);
                let low_mean = self.column_mean(|b| b.low);

                for series in &mut self.series {
                    for bar in &mut series.bars {
                        if !bar.open.is_finite() {
                            bar.open = open_mean;
                        }
                        if !bar.high.is_finite() {
                            bar.high = high_mean;
                        }
                        if !bar.low.is_finite() {
                            bar.low = low_mean;
                        }
                    }
                }
            }
            ImputePolicy::DropIncomplete => {
                for series in &mut self.series {
                    series.bars.retain(|b| b.is_complete());
                }
            }
        }
    }

    /// Mean of one bar column over the whole panel, ignoring NaN
    fn column_mean(&self, select: impl Fn(&DailyBar) -> f64) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for series in &self.series {
            for bar in &series.bars {
                let v = select(bar);
                if v.is_finite() {
                    sum += v;
                    count += 1;
                }
            }
        }
        if count > 0 {
            sum / count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn bar(day: u32, close: f64) -> DailyBar {
        DailyBar::new(date(day), close - 0.5, close + 1.0, close - 1.0, close, 1000.0)
    }

    #[test]
    fn test_return_pct() {
        let b = DailyBar::new(date(1), 100.0, 112.0, 98.0, 110.0, 1000.0);
        assert!((b.return_pct() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_series_rejects_unsorted_dates() {
        let bars = vec![bar(2, 100.0), bar(1, 101.0)];
        assert!(InstrumentSeries::new("AAPL".to_string(), bars).is_err());
    }

    #[test]
    fn test_series_rejects_duplicate_dates() {
        let bars = vec![bar(1, 100.0), bar(1, 101.0)];
        assert!(InstrumentSeries::new("AAPL".to_string(), bars).is_err());
    }

    #[test]
    fn test_panel_rejects_duplicate_symbols() {
        let a = InstrumentSeries::new("AAPL".to_string(), vec![bar(1, 100.0)]).unwrap();
        let b = InstrumentSeries::new("AAPL".to_string(), vec![bar(1, 200.0)]).unwrap();
        assert!(StockPanel::from_series(vec![a, b]).is_err());
    }

    #[test]
    fn test_panel_mean_imputation_pools_all_instruments() {
        let mut a_bars = vec![bar(1, 100.0), bar(2, 102.0)];
        a_bars[0].open = f64::NAN;
        let b_bars = vec![bar(1, 200.0)];

        let a = InstrumentSeries::new("AAPL".to_string(), a_bars).unwrap();
        let b = InstrumentSeries::new("MSFT".to_string(), b_bars).unwrap();
        let mut panel = StockPanel::from_series(vec![a, b]).unwrap();

        panel.impute_missing(ImputePolicy::PanelMean);

        // Mean over the two finite opens across both instruments:
        // (101.5 + 199.5) / 2 = 150.5
        let imputed = panel.get("AAPL").unwrap().bars[0].open;
        assert!((imputed - 150.5).abs() < 1e-10);
    }

    #[test]
    fn test_drop_incomplete_policy() {
        let mut bars = vec![bar(1, 100.0), bar(2, 101.0)];
        bars[1].high = f64::NAN;
        let series = InstrumentSeries::new("AAPL".to_string(), bars).unwrap();
        let mut panel = StockPanel::from_series(vec![series]).unwrap();

        panel.impute_missing(ImputePolicy::DropIncomplete);
        assert_eq!(panel.get("AAPL").unwrap().len(), 1);
    }
}
