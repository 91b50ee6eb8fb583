//! LSTM forecaster
//!
//! Stacked LSTM cells encode each window into the final hidden state of the
//! last layer; a linear readout on top of a persistence skip connection
//! produces the next-step scaled close.

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

/// One LSTM layer's cell weights
#[derive(Debug, Clone)]
pub struct LstmCell {
    pub input_size: usize,
    pub hidden_size: usize,

    // Input gate
    w_ii: Array2<f64>,
    w_hi: Array2<f64>,
    b_i: Array1<f64>,

    // Forget gate
    w_if: Array2<f64>,
    w_hf: Array2<f64>,
    b_f: Array1<f64>,

    // Cell candidate
    w_ig: Array2<f64>,
    w_hg: Array2<f64>,
    b_g: Array1<f64>,

    // Output gate
    w_io: Array2<f64>,
    w_ho: Array2<f64>,
    b_o: Array1<f64>,
}

impl LstmCell {
    /// Random initialization with limit `sqrt(1 / hidden_size)`.
    /// Forget-gate biases start at 1 so early state is carried forward.
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let dist = Uniform::new(-limit, limit);

        Self {
            input_size,
            hidden_size,
            w_ii: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hi: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_i: Array1::zeros(hidden_size),
            w_if: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hf: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_f: Array1::from_elem(hidden_size, 1.0),
            w_ig: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hg: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_g: Array1::zeros(hidden_size),
            w_io: Array2::random_using((hidden_size, input_size), dist, rng),
            w_ho: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_o: Array1::zeros(hidden_size),
        }
    }

    /// Forward pass for one time step; returns (h_next, c_next)
    pub fn forward(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let i_gate = sigmoid(&(self.w_ii.dot(x) + self.w_hi.dot(h_prev) + &self.b_i));
        let f_gate = sigmoid(&(self.w_if.dot(x) + self.w_hf.dot(h_prev) + &self.b_f));
        let g = tanh(&(self.w_ig.dot(x) + self.w_hg.dot(h_prev) + &self.b_g));
        let o_gate = sigmoid(&(self.w_io.dot(x) + self.w_ho.dot(h_prev) + &self.b_o));

        let c_next = &f_gate * c_prev + &i_gate * &g;
        let h_next = &o_gate * &tanh(&c_next);
        (h_next, c_next)
    }

    /// Zeroed hidden and cell state
    pub fn init_hidden(&self) -> (Array1<f64>, Array1<f64>) {
        (
            Array1::zeros(self.hidden_size),
            Array1::zeros(self.hidden_size),
        )
    }
}

/// LSTM variant of the ensemble
///
/// The recurrent weights stay fixed after seeded initialization; only the
/// readout head is trained (see [`crate::model::training`]).
#[derive(Debug, Clone)]
pub struct LstmForecaster {
    /// Hyperparameters the model was built with
    pub hyperparams: RecurrentHyperparams,
    input_size: usize,
    cells: Vec<LstmCell>,
    head: Dense,
    seed: u64,
}

impl LstmForecaster {
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
        cells.push(LstmCell::new(input_size, hyperparams.hidden_units, &mut rng));
        for _ in 1..hyperparams.num_layers {
            cells.push(LstmCell::new(
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

    /// Encode one window into the last layer's final hidden state
    fn encode(&self, window: ArrayView2<f64>) -> Array1<f64> {
        let mut states: Vec<(Array1<f64>, Array1<f64>)> =
            self.cells.iter().map(|c| c.init_hidden()).collect();

        for t in 0..window.nrows() {
            let mut layer_input: Array1<f64> = window.row(t).to_owned();
            for (layer_idx, cell) in self.cells.iter().enumerate() {
                let (h_prev, c_prev) = &states[layer_idx];
                let (h_next, c_next) = cell.forward(&layer_input, h_prev, c_prev);
                layer_input = h_next.clone();
                states[layer_idx] = (h_next, c_next);
            }
        }

        states.pop().expect("at least one layer").0
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

impl Forecaster for LstmForecaster {
    fn name(&self) -> &'static str {
        "lstm"
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
        self.check_shape(train, "lstm training windows")?;
        self.check_shape(validation, "lstm validation windows")?;

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
