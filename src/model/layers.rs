//! Basic neural layers shared by the forecasters

use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::Rng;

/// Activation function for a dense layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(&self, v: f64) -> f64 {
        match self {
            Activation::Linear => v,
            Activation::Relu => v.max(0.0),
            Activation::Tanh => v.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-v).exp()),
        }
    }
}

/// Fully connected layer
#[derive(Debug, Clone)]
pub struct Dense {
    /// Weights, shape `[output, input]`
    pub weights: Array2<f64>,
    /// Biases, shape `[output]`
    pub biases: Array1<f64>,
    /// Activation applied to the affine output
    pub activation: Activation,
}

impl Dense {
    /// Uniform random initialization with limit `sqrt(1 / input)`
    pub fn random(input: usize, output: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let limit = (1.0 / input as f64).sqrt();
        Self {
            weights: Array2::random_using((output, input), Uniform::new(-limit, limit), rng),
            biases: Array1::zeros(output),
            activation,
        }
    }

    /// All-zero initialization, used for readout heads that start at the
    /// persistence solution
    pub fn zeroed(input: usize, output: usize, activation: Activation) -> Self {
        Self {
            weights: Array2::zeros((output, input)),
            biases: Array1::zeros(output),
            activation,
        }
    }

    /// Forward pass for a single input vector
    pub fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        (self.weights.dot(x) + &self.biases).mapv(|v| self.activation.apply(v))
    }
}

/// Elementwise sigmoid
pub(crate) fn sigmoid(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

/// Elementwise tanh
pub(crate) fn tanh(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| v.tanh())
}

/// Inverted dropout mask: zero with probability `rate`, otherwise
/// `1 / (1 - rate)` so activations keep their expected scale
pub(crate) fn dropout_mask(len: usize, rate: f64, rng: &mut StdRng) -> Array1<f64> {
    if rate <= 0.0 {
        return Array1::ones(len);
    }
    let keep = 1.0 - rate;
    Array1::from_shape_fn(len, |_| {
        if rng.gen::<f64>() < keep {
            1.0 / keep
        } else {
            0.0
        }
    })
}
