//! Chronological train/test partitioning
//!
//! Order-preserving split at a fractional index. No shuffling, no
//! stratification: every train target date precedes every test target date.

use crate::error::PipelineError;
use crate::preprocessing::windows::WindowSet;

/// An ordered (train, test) pair of window sets
#[derive(Debug, Clone)]
pub struct Split {
    pub train: WindowSet,
    pub test: WindowSet,
}

/// Split windows at `floor(train_fraction * len)`, preserving time order.
///
/// Fewer than 2 windows cannot be partitioned; they all go to the training
/// side and the test set comes back empty. Callers must treat an empty test
/// set as a reportable condition.
pub fn chronological_split(
    windows: &WindowSet,
    train_fraction: f64,
) -> Result<Split, PipelineError> {
    if !(0.0..1.0).contains(&train_fraction) || train_fraction == 0.0 {
        return Err(PipelineError::TrainingConfiguration(format!(
            "train_fraction must be in (0, 1), got {}",
            train_fraction
        )));
    }

    let n = windows.len();
    let cut = if n < 2 {
        n
    } else {
        (train_fraction * n as f64).floor() as usize
    };

    Ok(Split {
        train: windows.slice(0, cut),
        test: windows.slice(cut, n),
    })
}
