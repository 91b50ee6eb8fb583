//! Seeded synthetic panel generation
//!
//! Gaussian random-walk closes around a base price, used by the demo binary
//! and the end-to-end tests. Deterministic for a given seed.

use crate::data::types::{DailyBar, InstrumentSeries, StockPanel};
use crate::error::PipelineError;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Generate one random-walk instrument series.
///
/// Closes follow `close[t] = close[t-1] + drift + N(0, sigma)`, starting at
/// `base_price`. Open/high/low are derived around the close so the bars are
/// internally consistent.
pub fn random_walk_series(
    symbol: &str,
    n: usize,
    base_price: f64,
    drift: f64,
    sigma: f64,
    seed: u64,
) -> Result<InstrumentSeries, PipelineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma)
        .map_err(|e| PipelineError::InvalidData(format!("bad sigma {}: {}", sigma, e)))?;

    let start = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid start date");
    let mut close = base_price;
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let prev_close = close;
        close += drift + normal.sample(&mut rng);
        // Keep the walk away from zero so ratios stay meaningful
        close = close.max(base_price * 0.05);

        let spread = sigma * rng.gen_range(0.2..1.0);
        let high = close.max(prev_close) + spread;
        let low = close.min(prev_close) - spread;
        let volume = 1_000_000.0 * rng.gen_range(0.5..1.5);

        bars.push(DailyBar::new(
            start + Duration::days(i as i64),
            prev_close,
            high,
            low,
            close,
            volume,
        ));
    }

    InstrumentSeries::new(symbol.to_string(), bars)
}

/// Generate a panel of random-walk instruments with zero drift
pub fn random_walk_panel(
    symbols: &[&str],
    n: usize,
    seed: u64,
) -> Result<StockPanel, PipelineError> {
    let mut series = Vec::with_capacity(symbols.len());
    for (i, symbol) in symbols.iter().enumerate() {
        let base = 100.0 * (i as f64 + 1.0);
        series.push(random_walk_series(
            symbol,
            n,
            base,
            0.0,
            1.0,
            seed.wrapping_add(i as u64),
        )?);
    }
    StockPanel::from_series(series)
}
