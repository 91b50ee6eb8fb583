//! Readout training shared by all three forecasters
//!
//! Each forecaster encodes a window into a fixed feature vector with frozen
//! random weights and predicts the next scaled close as the window's last
//! close plus a learned linear correction. Only that correction head is
//! trained here: mini-batch gradient descent on the mean squared error, with
//! early stopping on validation loss and the best weights restored.
//!
//! A zero-initialized head makes the initial model identical to the
//! persistence baseline, so the restored weights can never be worse than
//! persistence on the validation slice.

use crate::error::PipelineError;
use crate::model::config::TrainingOptions;
use crate::model::layers::{dropout_mask, Dense};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;

/// Outcome of one training run
#[derive(Debug, Clone)]
pub struct FitSummary {
    /// Epochs actually executed
    pub epochs_run: usize,
    /// Best validation loss observed (MSE, scaled units)
    pub best_val_loss: f64,
    /// True if patience ran out before the epoch budget
    pub stopped_early: bool,
}

/// Encoded training/validation data for the readout head
pub(crate) struct ReadoutProblem<'a> {
    /// Encoded window features, shape `[n, d]`
    pub train_features: &'a Array2<f64>,
    /// Last scaled close of each training window (the persistence offset)
    pub train_offsets: &'a Array1<f64>,
    /// Scaled-close targets
    pub train_targets: &'a Array1<f64>,
    pub val_features: &'a Array2<f64>,
    pub val_offsets: &'a Array1<f64>,
    pub val_targets: &'a Array1<f64>,
}

fn head_prediction(head: &Dense, features: &Array1<f64>, offset: f64) -> f64 {
    offset + head.forward(features)[0]
}

fn validation_loss(head: &Dense, problem: &ReadoutProblem) -> f64 {
    let n = problem.val_targets.len();
    let mut sum = 0.0;
    for i in 0..n {
        let pred = head_prediction(head, &problem.val_features.row(i).to_owned(), problem.val_offsets[i]);
        let diff = pred - problem.val_targets[i];
        sum += diff * diff;
    }
    sum / n as f64
}

/// Train the readout head in place
pub(crate) fn train_readout(
    head: &mut Dense,
    problem: &ReadoutProblem,
    dropout: f64,
    opts: &TrainingOptions,
    rng: &mut StdRng,
) -> Result<FitSummary, PipelineError> {
    opts.validate()?;

    let n = problem.train_targets.len();
    if n == 0 {
        return Err(PipelineError::TrainingConfiguration(
            "empty training set".to_string(),
        ));
    }
    if problem.val_targets.is_empty() {
        return Err(PipelineError::TrainingConfiguration(
            "empty validation set".to_string(),
        ));
    }
    let d = problem.train_features.ncols();

    let mut best_val = validation_loss(head, problem);
    let mut best_weights = head.weights.clone();
    let mut best_biases = head.biases.clone();

    let mut epochs_run = 0;
    let mut stopped_early = false;
    let mut patience_counter = 0;

    for epoch in 1..=opts.epochs {
        for batch_start in (0..n).step_by(opts.batch_size) {
            let batch_end = (batch_start + opts.batch_size).min(n);
            let batch_len = (batch_end - batch_start) as f64;

            let mut grad_w = Array1::<f64>::zeros(d);
            let mut grad_b = 0.0;

            for i in batch_start..batch_end {
                let mask = dropout_mask(d, dropout, rng);
                let features = &problem.train_features.row(i).to_owned() * &mask;
                let error =
                    head_prediction(head, &features, problem.train_offsets[i]) - problem.train_targets[i];
                grad_w.scaled_add(2.0 * error, &features);
                grad_b += 2.0 * error;
            }

            grad_w /= batch_len;
            grad_b /= batch_len;

            if let Some(clip) = opts.gradient_clip {
                let norm = (grad_w.dot(&grad_w) + grad_b * grad_b).sqrt();
                if norm > clip {
                    let scale = clip / norm;
                    grad_w *= scale;
                    grad_b *= scale;
                }
            }

            head.weights
                .row_mut(0)
                .scaled_add(-opts.learning_rate, &grad_w);
            head.biases[0] -= opts.learning_rate * grad_b;
        }

        epochs_run = epoch;
        let val = validation_loss(head, problem);
        if val + 1e-12 < best_val {
            best_val = val;
            best_weights = head.weights.clone();
            best_biases = head.biases.clone();
            patience_counter = 0;
        } else {
            patience_counter += 1;
            if patience_counter >= opts.patience {
                stopped_early = true;
                break;
            }
        }
    }

    head.weights = best_weights;
    head.biases = best_biases;

    Ok(FitSummary {
        epochs_run,
        best_val_loss: best_val,
        stopped_early,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::layers::Activation;
    use rand::SeedableRng;

    fn linear_problem(n: usize) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
        // Targets are offset + 0.3 * feature0 - 0.1 * feature1
        let features = Array2::from_shape_fn((n, 2), |(i, j)| {
            ((i * 7 + j * 3) % 13) as f64 / 13.0
        });
        let offsets = Array1::from_shape_fn(n, |i| (i % 5) as f64 / 10.0);
        let targets = Array1::from_shape_fn(n, |i| {
            offsets[i] + 0.3 * features[[i, 0]] - 0.1 * features[[i, 1]]
        });
        (features, offsets, targets)
    }

    #[test]
    fn test_readout_learns_linear_correction() {
        let (features, offsets, targets) = linear_problem(200);
        let (vf, vo, vt) = (
            features.slice(ndarray::s![160.., ..]).to_owned(),
            offsets.slice(ndarray::s![160..]).to_owned(),
            targets.slice(ndarray::s![160..]).to_owned(),
        );
        let (tf, to, tt) = (
            features.slice(ndarray::s![..160, ..]).to_owned(),
            offsets.slice(ndarray::s![..160]).to_owned(),
            targets.slice(ndarray::s![..160]).to_owned(),
        );

        let problem = ReadoutProblem {
            train_features: &tf,
            train_offsets: &to,
            train_targets: &tt,
            val_features: &vf,
            val_offsets: &vo,
            val_targets: &vt,
        };

        let mut head = Dense::zeroed(2, 1, Activation::Linear);
        let mut rng = StdRng::seed_from_u64(11);
        let opts = TrainingOptions {
            epochs: 300,
            patience: 50,
            ..TrainingOptions::default()
        };
        let summary = train_readout(&mut head, &problem, 0.0, &opts, &mut rng).unwrap();

        assert!(summary.best_val_loss < 1e-3);
        assert!(summary.epochs_run >= 1);
    }

    #[test]
    fn test_restored_weights_never_worse_than_initial() {
        let (features, offsets, targets) = linear_problem(60);
        let problem = ReadoutProblem {
            train_features: &features,
            train_offsets: &offsets,
            train_targets: &targets,
            val_features: &features,
            val_offsets: &offsets,
            val_targets: &targets,
        };

        let mut head = Dense::zeroed(2, 1, Activation::Linear);
        let initial_loss = validation_loss(&head, &problem);

        let mut rng = StdRng::seed_from_u64(2);
        // Hostile learning rate: updates may overshoot, but the restored
        // weights must still match the best validation loss seen
        let opts = TrainingOptions {
            epochs: 20,
            learning_rate: 5.0,
            gradient_clip: None,
            ..TrainingOptions::default()
        };
        let summary = train_readout(&mut head, &problem, 0.0, &opts, &mut rng).unwrap();

        assert!(summary.best_val_loss <= initial_loss + 1e-12);
        let final_loss = validation_loss(&head, &problem);
        assert!((final_loss - summary.best_val_loss).abs() < 1e-9);
    }

    #[test]
    fn test_empty_training_set_fails_fast() {
        let features = Array2::zeros((0, 2));
        let offsets = Array1::zeros(0);
        let targets = Array1::zeros(0);
        let val_features = Array2::zeros((1, 2));
        let val_offsets = Array1::zeros(1);
        let val_targets = Array1::zeros(1);

        let problem = ReadoutProblem {
            train_features: &features,
            train_offsets: &offsets,
            train_targets: &targets,
            val_features: &val_features,
            val_offsets: &val_offsets,
            val_targets: &val_targets,
        };

        let mut head = Dense::zeroed(2, 1, Activation::Linear);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            train_readout(&mut head, &problem, 0.0, &TrainingOptions::default(), &mut rng),
            Err(PipelineError::TrainingConfiguration(_))
        ));
    }

    #[test]
    fn test_early_stopping_respects_patience() {
        // Constant targets equal to the offset: the zero head is already
        // optimal, so no epoch improves and patience must trigger
        let features = Array2::from_elem((40, 3), 0.5);
        let offsets = Array1::from_elem(40, 0.4);
        let targets = Array1::from_elem(40, 0.4);

        let problem = ReadoutProblem {
            train_features: &features,
            train_offsets: &offsets,
            train_targets: &targets,
            val_features: &features,
            val_offsets: &offsets,
            val_targets: &targets,
        };

        let mut head = Dense::zeroed(3, 1, Activation::Linear);
        let mut rng = StdRng::seed_from_u64(0);
        let opts = TrainingOptions {
            epochs: 100,
            patience: 5,
            ..TrainingOptions::default()
        };
        let summary = train_readout(&mut head, &problem, 0.0, &opts, &mut rng).unwrap();

        assert!(summary.stopped_early);
        assert_eq!(summary.epochs_run, 5);
    }
}
