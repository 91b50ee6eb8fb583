//! Bounded random hyperparameter search
//!
//! Draws trials from a [`SearchSpace`], trains each candidate with the
//! shared early-stopping contract, and keeps the model with the best
//! validation loss. The search is budget-bounded and best-effort, not
//! exhaustive.

use crate::error::PipelineError;
use crate::model::config::{RecurrentHyperparams, SearchSpace, TrainingOptions};
use crate::model::training::FitSummary;
use crate::model::Forecaster;
use crate::preprocessing::WindowSet;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

/// One completed trial
#[derive(Debug, Clone)]
pub struct TrialRecord {
    pub hyperparams: RecurrentHyperparams,
    pub val_loss: f64,
    pub epochs_run: usize,
}

/// Result of a search: the winning model plus the full trial history
#[derive(Debug)]
pub struct SearchOutcome<M> {
    pub model: M,
    pub hyperparams: RecurrentHyperparams,
    pub val_loss: f64,
    pub trials: Vec<TrialRecord>,
}

/// Run a random search over `space`, building each candidate with `build`.
///
/// `build` receives the sampled hyperparameters and a per-trial seed, so a
/// fixed `seed` makes the whole search reproducible. Fails before any fit
/// if the space, options or training set are unusable.
pub fn random_search<M, B>(
    space: &SearchSpace,
    build: B,
    train: &WindowSet,
    validation: &WindowSet,
    opts: &TrainingOptions,
    seed: u64,
) -> Result<SearchOutcome<M>, PipelineError>
where
    M: Forecaster,
    B: Fn(&RecurrentHyperparams, u64) -> Result<M, PipelineError>,
{
    space.validate()?;
    opts.validate()?;
    if train.is_empty() {
        return Err(PipelineError::TrainingConfiguration(
            "empty training set".to_string(),
        ));
    }
    if validation.is_empty() {
        return Err(PipelineError::TrainingConfiguration(
            "empty validation set".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut trials = Vec::with_capacity(space.max_trials);
    let mut best: Option<(M, RecurrentHyperparams, f64)> = None;

    let pb = ProgressBar::new(space.max_trials as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] trial {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    for trial in 0..space.max_trials {
        let hyperparams = space.sample(&mut rng);
        let mut model = build(&hyperparams, seed.wrapping_add(trial as u64 + 1))?;
        let summary: FitSummary = model.fit(train, validation, opts)?;

        debug!(
            "trial {}/{}: layers={} units={} dropout={:.2} val_loss={:.6}",
            trial + 1,
            space.max_trials,
            hyperparams.num_layers,
            hyperparams.hidden_units,
            hyperparams.dropout,
            summary.best_val_loss
        );

        let improved = best
            .as_ref()
            .map(|(_, _, loss)| summary.best_val_loss < *loss)
            .unwrap_or(true);
        if improved {
            info!(
                "{} trial {}: new best val_loss={:.6} (layers={}, units={}, dropout={:.2})",
                model.name(),
                trial + 1,
                summary.best_val_loss,
                hyperparams.num_layers,
                hyperparams.hidden_units,
                hyperparams.dropout
            );
            best = Some((model, hyperparams.clone(), summary.best_val_loss));
        }

        trials.push(TrialRecord {
            hyperparams,
            val_loss: summary.best_val_loss,
            epochs_run: summary.epochs_run,
        });

        pb.set_message(format!(
            "best {:.6}",
            best.as_ref().map(|(_, _, l)| *l).unwrap_or(f64::NAN)
        ));
        pb.inc(1);
    }
    pb.finish_and_clear();

    let (model, hyperparams, val_loss) = best.ok_or_else(|| {
        PipelineError::TrainingConfiguration("hyperparameter search ran no trials".to_string())
    })?;

    Ok(SearchOutcome {
        model,
        hyperparams,
        val_loss,
        trials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LstmForecaster;
    use crate::preprocessing::make_windows;
    use chrono::NaiveDate;
    use ndarray::Array2;

    fn toy_windows(rows: usize, w: usize) -> WindowSet {
        let matrix = Array2::from_shape_fn((rows, 5), |(i, j)| {
            ((i as f64 * 0.31 + j as f64).sin() + 1.0) / 2.0
        });
        let dates: Vec<NaiveDate> = (0..rows)
            .map(|i| {
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i as i64)
            })
            .collect();
        make_windows(&matrix, &dates, w).unwrap()
    }

    fn small_space(trials: usize) -> SearchSpace {
        SearchSpace {
            num_layers: vec![1],
            hidden_units: vec![4, 8],
            dropout_range: (0.2, 0.3),
            max_trials: trials,
        }
    }

    #[test]
    fn test_search_returns_best_trial() {
        let ws = toy_windows(60, 5);
        let train = ws.slice(0, 40);
        let val = ws.slice(40, ws.len());

        let opts = TrainingOptions {
            epochs: 4,
            ..TrainingOptions::default()
        };
        let outcome = random_search(
            &small_space(3),
            |hp, seed| LstmForecaster::new(5, hp.clone(), seed),
            &train,
            &val,
            &opts,
            42,
        )
        .unwrap();

        assert_eq!(outcome.trials.len(), 3);
        let min_loss = outcome
            .trials
            .iter()
            .map(|t| t.val_loss)
            .fold(f64::INFINITY, f64::min);
        assert!((outcome.val_loss - min_loss).abs() < 1e-12);
    }

    #[test]
    fn test_search_is_reproducible() {
        let ws = toy_windows(50, 5);
        let train = ws.slice(0, 35);
        let val = ws.slice(35, ws.len());
        let opts = TrainingOptions {
            epochs: 3,
            ..TrainingOptions::default()
        };

        let run = || {
            random_search(
                &small_space(2),
                |hp, seed| LstmForecaster::new(5, hp.clone(), seed),
                &train,
                &val,
                &opts,
                7,
            )
            .unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.hyperparams, b.hyperparams);
        assert!((a.val_loss - b.val_loss).abs() < 1e-12);
    }

    #[test]
    fn test_empty_training_set_fails_before_fit() {
        let ws = toy_windows(30, 5);
        let empty = ws.slice(0, 0);
        let val = ws.slice(0, 5);
        let result = random_search(
            &small_space(2),
            |hp, seed| LstmForecaster::new(5, hp.clone(), seed),
            &empty,
            &val,
            &TrainingOptions::default(),
            1,
        );
        assert!(matches!(
            result,
            Err(PipelineError::TrainingConfiguration(_))
        ));
    }

    #[test]
    fn test_malformed_space_fails_before_fit() {
        let ws = toy_windows(30, 5);
        let train = ws.slice(0, 20);
        let val = ws.slice(20, ws.len());
        let space = SearchSpace {
            dropout_range: (0.9, 0.1),
            ..small_space(2)
        };
        assert!(random_search(
            &space,
            |hp, seed| LstmForecaster::new(5, hp.clone(), seed),
            &train,
            &val,
            &TrainingOptions::default(),
            1,
        )
        .is_err());
    }
}
