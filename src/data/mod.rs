//! Panel data structures, CSV loading and synthetic generation

mod loader;
mod synthetic;
mod types;

pub use loader::load_panel;
pub use synthetic::{random_walk_panel, random_walk_series};
pub use types::{DailyBar, ImputePolicy, InstrumentSeries, StockPanel};
