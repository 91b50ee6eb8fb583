//! Scaling, windowing and chronological splitting

mod scaler;
mod split;
mod windows;

pub use scaler::{MinMaxScaler, RangePolicy};
pub use split::{chronological_split, Split};
pub use windows::{make_windows, WindowSet};
