//! Min-max feature scaling
//!
//! One scaler is fit once over the pooled panel's feature rows and then
//! shared read-only by every downstream stage. `fit` is the only way to
//! obtain a scaler, so a fitted instance cannot be refit or mutated.

use crate::error::PipelineError;
use crate::features::{FeatureRow, CLOSE_COLUMN, FEATURE_NAMES};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Behaviour when a value falls outside the fitted min/max range.
///
/// `Clip` (the default) clamps the scaled value into [0, 1]; this keeps
/// evaluation running when test-time prices drift past the fitted range.
/// `Strict` rejects the value with [`PipelineError::ScaleRange`] instead.
/// The inverse transform never clips: it is the exact algebraic inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangePolicy {
    Clip,
    Strict,
}

impl Default for RangePolicy {
    fn default() -> Self {
        RangePolicy::Clip
    }
}

/// Per-feature min-max scaler mapping each column into [0, 1]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    maxs: Vec<f64>,
    policy: RangePolicy,
}

impl MinMaxScaler {
    /// Fit per-feature minima and maxima over the provided rows.
    ///
    /// The rows should be the pooled feature rows of the whole panel;
    /// fitting per instrument would corrupt the shared scale.
    pub fn fit(rows: &[FeatureRow], policy: RangePolicy) -> Result<Self, PipelineError> {
        if rows.is_empty() {
            return Err(PipelineError::DataInsufficiency {
                needed: 1,
                got: 0,
                context: "scaler fit".to_string(),
            });
        }

        let mut mins = vec![f64::INFINITY; FeatureRow::NUM_FEATURES];
        let mut maxs = vec![f64::NEG_INFINITY; FeatureRow::NUM_FEATURES];

        for row in rows {
            for (j, &v) in row.values().iter().enumerate() {
                if v < mins[j] {
                    mins[j] = v;
                }
                if v > maxs[j] {
                    maxs[j] = v;
                }
            }
        }

        Ok(Self { mins, maxs, policy })
    }

    /// Fitted minimum for each feature column
    pub fn mins(&self) -> &[f64] {
        &self.mins
    }

    /// Fitted maximum for each feature column
    pub fn maxs(&self) -> &[f64] {
        &self.maxs
    }

    fn scale_value(&self, j: usize, v: f64) -> Result<f64, PipelineError> {
        let min = self.mins[j];
        let range = self.maxs[j] - min;
        if range <= f64::EPSILON {
            // Degenerate column: every fitted value was identical.
            // 0.5 round-trips back to the constant exactly.
            return Ok(0.5);
        }

        let scaled = (v - min) / range;
        if !(0.0..=1.0).contains(&scaled) {
            match self.policy {
                RangePolicy::Clip => Ok(scaled.clamp(0.0, 1.0)),
                RangePolicy::Strict => Err(PipelineError::ScaleRange {
                    feature: FEATURE_NAMES[j],
                    value: v,
                    min,
                    max: self.maxs[j],
                }),
            }
        } else {
            Ok(scaled)
        }
    }

    /// Map feature rows into the fitted [0, 1] range.
    ///
    /// Returns a matrix of shape `[rows, features]` with the close price in
    /// column [`CLOSE_COLUMN`].
    pub fn transform(&self, rows: &[FeatureRow]) -> Result<Array2<f64>, PipelineError> {
        let mut out = Array2::zeros((rows.len(), FeatureRow::NUM_FEATURES));
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.values().iter().enumerate() {
                out[[i, j]] = self.scale_value(j, v)?;
            }
        }
        Ok(out)
    }

    /// Exact algebraic inverse of [`transform`](Self::transform).
    ///
    /// Each column is inverted independently, so a matrix whose non-close
    /// columns hold placeholder values still restores the close correctly.
    pub fn inverse_transform(&self, scaled: &Array2<f64>) -> Array2<f64> {
        let mut out = scaled.clone();
        for (j, mut column) in out.columns_mut().into_iter().enumerate() {
            let min = self.mins[j];
            let range = self.maxs[j] - min;
            if range <= f64::EPSILON {
                column.fill(min);
            } else {
                column.mapv_inplace(|s| min + s * range);
            }
        }
        out
    }

    /// Restore real closing prices from a scaled close column.
    ///
    /// Model outputs are single scaled-close scalars; this pads the other
    /// feature columns with zeros, inverts the full matrix, and reads the
    /// close column back out. Valid because the inverse is linear and
    /// per-column independent.
    pub fn inverse_close(&self, scaled_close: &Array1<f64>) -> Array1<f64> {
        let mut padded = Array2::zeros((scaled_close.len(), FeatureRow::NUM_FEATURES));
        padded.column_mut(CLOSE_COLUMN).assign(scaled_close);
        self.inverse_transform(&padded).column(CLOSE_COLUMN).to_owned()
    }

    /// Save the fitted scaler to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let encoded = bincode::serialize(self)
            .map_err(|e| PipelineError::InvalidData(format!("scaler serialization: {}", e)))?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Load a fitted scaler from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let data = std::fs::read(path)?;
        bincode::deserialize(&data)
            .map_err(|e| PipelineError::InvalidData(format!("scaler deserialization: {}", e)))
    }
}
