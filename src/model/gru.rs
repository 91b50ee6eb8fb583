//! GRU forecaster
//!
//! Lighter recurrent variant with two gates instead of three. Same encoding
//! and readout-training contract as the LSTM.

use crate::error::PipelineError;
use crate::model::config::{RecurrentHyperparams, TrainingOptions};
use crate::model::layers::{sigmoid, tanh, Activation, Dense};
use crate::model::training::{train_readout, FitSummary, ReadoutProblem};
use crate::model::Forecaster;
use crate::preprocessing::WindowSet;
use ndarray::{s, Array1, Array2, ArrayView2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// One GRU layer's cell weights
#[derive(Debug, Clone)]
pub struct GruCell {
    pub input_size: usize,
    pub hidden_size: usize,

    // Update gate
    w_iz: Array2<f64>,
    w_hz: Array2<f64>,
    b_z: Array1<f64>,

    // Reset gate
    w_ir: Array2<f64>,
    w_hr: Array2<f64>,
    b_r: Array1<f64>,

    // Candidate hidden state
    w_in: Array2<f64>,
    w_hn: Array2<f64>,
    b_n: Array1<f64>,
}

impl GruCell {
    /// Random initialization with limit `sqrt(1 / hidden_size)`
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let dist = Uniform::new(-limit, limit);

        Self {
            input_size,
            hidden_size,
            w_iz: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hz: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_z: Array1::zeros(hidden_size),
            w_ir: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hr: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_r: Array1::zeros(hidden_size),
            w_in: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hn: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_n: Array1::zeros(hidden_size),
        }
    }

    /// Forward pass for one time step; returns the new hidden state
    pub fn forward(&self, x: &Array1<f64>, h_prev: &Array1<f64>) -> Array1<f64> {
        let z_gate = sigmoid(&(self.w_iz.dot(x) + self.w_hz.dot(h_prev) + &self.b_z));
        let r_gate = sigmoid(&(self.w_ir.dot(x) + self.w_hr.dot(h_prev) + &self.b_r));
        let candidate = tanh(&(self.w_in.dot(x) + self.w_hn.dot(&(&r_gate * h_prev)) + &self.b_n));

        let one_minus_z = z_gate.mapv(|v| 1.0 - v);
        &one_minus_z * &candidate + &z_gate * h_prev
    }

    /// Zeroed hidden state
    pub fn init_hidden(&self) -> Array1<f64> {
        Array1::zeros(self.hidden_size)
    }
}

/// GRU variant of the ensemble
#[derive(Debug, Clone)]
pub struct GruForecaster {
    /// Hyperparameters the model was built with
    pub hyperparams: RecurrentHyperparams,
    input_size: usize,
    cells: Vec<GruCell>,
    head: Dense,
    seed: u64,
}

impl GruForecaster {
    /// Build a forecaster for `input_size` features per time step
    pub fn new(
        input_size: usize,
        hyperparams: RecurrentHyperparams,
        seed: u64,
    ) -> Result<Self, PipelineError> {
        hyperparams.validate()?;
        if input_size == 0 {
            return Err(PipelineError::TrainingConfiguration(
                "input_size must be positive".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut cells = Vec::with_capacity(hyperparams.num_layers);
        cells.push(GruCell::new(input_size, hyperparams.hidden_units, &mut rng));
        for _ in 1..hyperparams.num_layers {
            cells.push(GruCell::new(
                hyperparams.hidden_units,
                hyperparams.hidden_units,
                &mut rng,
            ));
        }

        Ok(Self {
            head: Dense::zeroed(hyperparams.hidden_units, 1, Activation::Linear),
            hyperparams,
            input_size,
            cells,
            seed,
        })
    }

    fn encode(&self, window: ArrayView2<f64>) -> Array1<f64> {
        let mut states: Vec<Array1<f64>> = self.cells.iter().map(|c| c.init_hidden()).collect();

        for t in 0..window.nrows() {
            let mut layer_input: Array1<f64> = window.row(t).to_owned();
            for (layer_idx, cell) in self.cells.iter().enumerate() {
                let h_next = cell.forward(&layer_input, &states[layer_idx]);
                layer_input = h_next.clone();
                states[layer_idx] = h_next;
            }
        }

        states.pop().expect("at least one layer")
    }

    fn encode_all(&self, windows: &WindowSet) -> Array2<f64> {
        let mut out = Array2::zeros((windows.len(), self.hyperparams.hidden_units));
        for i in 0..windows.len() {
            out.row_mut(i).assign(&self.encode(windows.x.slice(s![i, .., ..])));
        }
        out
    }

    fn check_shape(&self, windows: &WindowSet, context: &str) -> Result<(), PipelineError> {
        if windows.num_features() != self.input_size {
            return Err(PipelineError::TrainingConfiguration(format!(
                "{}: expected {} features per step, got {}",
                context,
                self.input_size,
                windows.num_features()
            )));
        }
        Ok(())
    }
}

impl Forecaster for GruForecaster {
    fn name(&self) -> &'static str {
        "gru"
    }

    fn fit(
        &mut self,
        train: &WindowSet,
        validation: &WindowSet,
        opts: &TrainingOptions,
    ) -> Result<FitSummary, PipelineError> {
        if train.is_empty() {
            return Err(PipelineError::TrainingConfiguration(
                "empty training set".to_string(),
            ));
        }
        self.check_shape(train, "gru training windows")?;
        self.check_shape(validation, "gru validation windows")?;

        let train_features = self.encode_all(train);
        let val_features = self.encode_all(validation);
        let train_offsets = train.last_closes();
        let val_offsets = validation.last_closes();

        let problem = ReadoutProblem {
            train_features: &train_features,
            train_offsets: &train_offsets,
            train_targets: &train.y,
            val_features: &val_features,
            val_offsets: &val_offsets,
            val_targets: &validation.y,
        };

        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        train_readout(&mut self.head, &problem, self.hyperparams.dropout, opts, &mut rng)
    }

    fn predict(&self, windows: &WindowSet) -> Array1<f64> {
        let offsets = windows.last_closes();
        let features = self.encode_all(windows);
        Array1::from_shape_fn(windows.len(), |i| {
            offsets[i] + self.head.forward(&features.row(i).to_owned())[0]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::make_windows;
    use chrono::NaiveDate;
    use ndarray::Array2;

    fn hp(layers: usize, units: usize) -> RecurrentHyperparams {
        RecurrentHyperparams {
            num_layers: layers,
            hidden_units: units,
            dropout: 0.25,
        }
    }

    fn toy_windows(rows: usize, w: usize) -> WindowSet {
        let matrix = Array2::from_shape_fn((rows, 5), |(i, j)| {
            ((i as f64 * 0.29 + j as f64 * 1.3).cos() + 1.0) / 2.0
        });
        let dates: Vec<NaiveDate> = (0..rows)
            .map(|i| {
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i as i64)
            })
            .collect();
        make_windows(&matrix, &dates, w).unwrap()
    }

    #[test]
    fn test_cell_forward_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let cell = GruCell::new(5, 12, &mut rng);
        let h = cell.init_hidden();
        let h_next = cell.forward(&Array1::zeros(5), &h);
        assert_eq!(h_next.len(), 12);
    }

    #[test]
    fn test_hidden_state_bounded() {
        let mut rng = StdRng::seed_from_u64(2);
        let cell = GruCell::new(5, 12, &mut rng);
        let mut h = cell.init_hidden();
        for t in 0..100 {
            let x = Array1::from_elem(5, (t as f64 * 0.1).sin().abs());
            h = cell.forward(&x, &h);
        }
        for &v in h.iter() {
            assert!(v.abs() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_untrained_model_equals_persistence() {
        let model = GruForecaster::new(5, hp(2, 8), 5).unwrap();
        let ws = toy_windows(30, 6);
        let preds = model.predict(&ws);
        let last = ws.last_closes();
        for i in 0..ws.len() {
            assert!((preds[i] - last[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fit_runs_and_reports_val_loss() {
        let mut model = GruForecaster::new(5, hp(1, 8), 5).unwrap();
        let ws = toy_windows(80, 6);
        let train = ws.slice(0, 60);
        let val = ws.slice(60, ws.len());

        let opts = TrainingOptions {
            epochs: 8,
            ..TrainingOptions::default()
        };
        let summary = model.fit(&train, &val, &opts).unwrap();
        assert!(summary.best_val_loss.is_finite());
        assert!(summary.epochs_run >= 1 && summary.epochs_run <= 8);
    }
}
