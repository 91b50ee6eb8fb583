//! Convolutional forecaster
//!
//! Fixed architecture, no hyperparameter search: one causal temporal
//! convolution over the window, dropout, a flattened feature map, and a
//! dense head on top of the persistence skip connection.

use crate::error::PipelineError;
use crate::model::config::TrainingOptions;
use crate::model::layers::{Activation, Dense};
use crate::model::training::{train_readout, FitSummary, ReadoutProblem};
use crate::model::Forecaster;
use crate::preprocessing::WindowSet;
use ndarray::{s, Array1, Array2, ArrayView2};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Number of convolution filters
const FILTERS: usize = 64;
/// Convolution kernel size (time steps)
const KERNEL_SIZE: usize = 3;
/// Dense feature size after the flattened conv map
const HIDDEN_UNITS: usize = 64;
/// Dropout rate during readout training
const DROPOUT: f64 = 0.3;

/// Causal 1D convolution: output at time t sees inputs at times <= t only
#[derive(Debug, Clone)]
pub struct CausalConv1d {
    /// Weights, shape `[out_channels, in_channels * kernel_size]`
    weights: Array2<f64>,
    bias: Array1<f64>,
    kernel_size: usize,
    in_channels: usize,
    out_channels: usize,
}

impl CausalConv1d {
    /// He-initialized convolution
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: usize, rng: &mut StdRng) -> Self {
        let std = (2.0 / (in_channels * kernel_size) as f64).sqrt();
        let dist = Normal::new(0.0, std).expect("valid normal");

        Self {
            weights: Array2::random_using((out_channels, in_channels * kernel_size), dist, rng),
            bias: Array1::zeros(out_channels),
            kernel_size,
            in_channels,
            out_channels,
        }
    }

    /// Forward pass over `[in_channels, seq_len]`, left-padded so the
    /// output keeps the input length
    pub fn forward(&self, input: ArrayView2<f64>) -> Array2<f64> {
        let (in_channels, seq_len) = input.dim();
        debug_assert_eq!(in_channels, self.in_channels);

        let padding = self.kernel_size - 1;
        let mut padded = Array2::zeros((in_channels, seq_len + padding));
        padded.slice_mut(s![.., padding..]).assign(&input);

        let mut output = Array2::zeros((self.out_channels, seq_len));
        for t in 0..seq_len {
            for out_c in 0..self.out_channels {
                let mut sum = self.bias[out_c];
                for k in 0..self.kernel_size {
                    let input_idx = t + padding - k;
                    for in_c in 0..in_channels {
                        let weight_idx = in_c * self.kernel_size + k;
                        sum += self.weights[[out_c, weight_idx]] * padded[[in_c, input_idx]];
                    }
                }
                output[[out_c, t]] = sum;
            }
        }
        output
    }
}

/// Convolutional variant of the ensemble
///
/// Convolution and dense feature weights stay fixed after seeded
/// initialization; only the readout head is trained.
#[derive(Debug, Clone)]
pub struct ConvForecaster {
    input_size: usize,
    window_length: usize,
    conv: CausalConv1d,
    hidden: Dense,
    head: Dense,
    seed: u64,
}

impl ConvForecaster {
    /// Build a forecaster for windows of `window_length` rows with
    /// `input_size` features per row
    pub fn new(input_size: usize, window_length: usize, seed: u64) -> Result<Self, PipelineError> {
        if input_size == 0 || window_length == 0 {
            return Err(PipelineError::TrainingConfiguration(
                "input_size and window_length must be positive".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let conv = CausalConv1d::new(input_size, FILTERS, KERNEL_SIZE, &mut rng);
        let hidden = Dense::random(FILTERS * window_length, HIDDEN_UNITS, Activation::Relu, &mut rng);

        Ok(Self {
            input_size,
            window_length,
            conv,
            hidden,
            head: Dense::zeroed(HIDDEN_UNITS, 1, Activation::Linear),
            seed,
        })
    }

    /// Encode one window: conv + relu, flatten, dense relu features
    fn encode(&self, window: ArrayView2<f64>) -> Array1<f64> {
        // Conv operates over [channels, time]
        let channels_first = window.t();
        let conv_out = self.conv.forward(channels_first).mapv(|v| v.max(0.0));
        let flat = Array1::from_iter(conv_out.iter().copied());
        self.hidden.forward(&flat)
    }

    fn encode_all(&self, windows: &WindowSet) -> Array2<f64> {
        let mut out = Array2::zeros((windows.len(), HIDDEN_UNITS));
        for i in 0..windows.len() {
            out.row_mut(i).assign(&self.encode(windows.x.slice(s![i, .., ..])));
        }
        out
    }

    fn check_shape(&self, windows: &WindowSet, context: &str) -> Result<(), PipelineError> {
        if windows.num_features() != self.input_size || windows.window_length() != self.window_length
        {
            return Err(PipelineError::TrainingConfiguration(format!(
                "{}: expected [{} x {}] windows, got [{} x {}]",
                context,
                self.window_length,
                self.input_size,
                windows.window_length(),
                windows.num_features()
            )));
        }
        Ok(())
    }
}

impl Forecaster for ConvForecaster {
    fn name(&self) -> &'static str {
        "cnn"
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
        self.check_shape(train, "cnn training windows")?;
        self.check_shape(validation, "cnn validation windows")?;

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
        train_readout(&mut self.head, &problem, DROPOUT, opts, &mut rng)
    }

    fn predict(&self, windows: &WindowSet) -> Array1<f64> {
        let offsets = windows.last_closes();
        let features = self.encode_all(windows);
        Array1::from_shape_fn(windows.len(), |i| {
            offsets[i] + self.head.forward(&features.row(i).to_owned())[0]
        })
    }
}
