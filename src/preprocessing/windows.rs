//! Sequence windowing
//!
//! Slices a scaled feature matrix into fixed-length overlapping windows and
//! their one-step-ahead scaled-close targets. Consecutive windows share
//! `window_length - 1` rows, so they are not independent samples.

use crate::error::PipelineError;
use crate::features::CLOSE_COLUMN;
use chrono::NaiveDate;
use ndarray::{s, Array1, Array2, Array3};

/// A batch of windows with aligned targets
#[derive(Debug, Clone)]
pub struct WindowSet {
    /// Inputs, shape `[windows, window_length, features]`
    pub x: Array3<f64>,
    /// Scaled close at the row following each window
    pub y: Array1<f64>,
    /// Date of each target row, for leakage checks and reporting
    pub target_dates: Vec<NaiveDate>,
}

impl WindowSet {
    /// Number of windows
    pub fn len(&self) -> usize {
        self.x.shape()[0]
    }

    /// True if the set holds no windows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Window length
    pub fn window_length(&self) -> usize {
        self.x.shape()[1]
    }

    /// Number of feature columns
    pub fn num_features(&self) -> usize {
        self.x.shape()[2]
    }

    /// Scaled close at the last row of each window
    pub fn last_closes(&self) -> Array1<f64> {
        let w = self.window_length();
        self.x.slice(s![.., w - 1, CLOSE_COLUMN]).to_owned()
    }

    /// Contiguous sub-range of windows, preserving order
    pub fn slice(&self, start: usize, end: usize) -> WindowSet {
        WindowSet {
            x: self.x.slice(s![start..end, .., ..]).to_owned(),
            y: self.y.slice(s![start..end]).to_owned(),
            target_dates: self.target_dates[start..end].to_vec(),
        }
    }

    /// Concatenate window sets along the sample axis.
    ///
    /// All sets must share window length and feature count.
    pub fn concat(sets: &[&WindowSet]) -> Result<WindowSet, PipelineError> {
        let nonempty: Vec<&&WindowSet> = sets.iter().filter(|s| !s.is_empty()).collect();
        let first = nonempty.first().ok_or_else(|| PipelineError::DataInsufficiency {
            needed: 1,
            got: 0,
            context: "window concatenation".to_string(),
        })?;

        let (w, f) = (first.window_length(), first.num_features());
        let total: usize = nonempty.iter().map(|s| s.len()).sum();

        let mut x = Array3::zeros((total, w, f));
        let mut y = Array1::zeros(total);
        let mut target_dates = Vec::with_capacity(total);

        let mut offset = 0;
        for set in &nonempty {
            if set.window_length() != w || set.num_features() != f {
                return Err(PipelineError::Alignment {
                    left: w * f,
                    right: set.window_length() * set.num_features(),
                    context: "window concatenation shapes".to_string(),
                });
            }
            let n = set.len();
            x.slice_mut(s![offset..offset + n, .., ..]).assign(&set.x);
            y.slice_mut(s![offset..offset + n]).assign(&set.y);
            target_dates.extend_from_slice(&set.target_dates);
            offset += n;
        }

        Ok(WindowSet { x, y, target_dates })
    }
}

/// Slice a scaled matrix into windows of `window_length` rows.
///
/// For each index `i` in `0..len - window_length`, the window covers rows
/// `[i, i + window_length)` and the target is the scaled close at row
/// `i + window_length`. A matrix shorter than `window_length + 1` rows
/// yields zero windows. Pure function; no shared state.
pub fn make_windows(
    matrix: &Array2<f64>,
    dates: &[NaiveDate],
    window_length: usize,
) -> Result<WindowSet, PipelineError> {
    if window_length == 0 {
        return Err(PipelineError::TrainingConfiguration(
            "window_length must be positive".to_string(),
        ));
    }
    if dates.len() != matrix.nrows() {
        return Err(PipelineError::Alignment {
            left: matrix.nrows(),
            right: dates.len(),
            context: "feature matrix vs dates".to_string(),
        });
    }

    let rows = matrix.nrows();
    let features = matrix.ncols();
    let n = rows.saturating_sub(window_length);

    let mut x = Array3::zeros((n, window_length, features));
    let mut y = Array1::zeros(n);
    let mut target_dates = Vec::with_capacity(n);

    for i in 0..n {
        x.slice_mut(s![i, .., ..])
            .assign(&matrix.slice(s![i..i + window_length, ..]));
        y[i] = matrix[[i + window_length, CLOSE_COLUMN]];
        target_dates.push(dates[i + window_length]);
    }

    Ok(WindowSet { x, y, target_dates })
}
