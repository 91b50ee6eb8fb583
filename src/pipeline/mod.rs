//! End-to-end forecasting pipeline
//!
//! Stages run strictly in order: impute -> engineer features -> fit one
//! scaler over the pooled panel -> window per instrument -> chronological
//! split -> train the three forecasters on the pooled training windows ->
//! evaluate per instrument. Each stage's output is a hard prerequisite for
//! the next; any failure propagates to the caller.

use crate::data::{ImputePolicy, StockPanel};
use crate::ensemble::{combine, ConfidenceBand, UncertaintyEstimator};
use crate::error::PipelineError;
use crate::evaluation::{paired_t_test, PairedTTest, RegressionReport};
use crate::features::{FeatureConfig, FeatureEngineer};
use crate::model::{
    random_search, ConvForecaster, Forecaster, GruForecaster, LstmForecaster,
    PersistenceBaseline, RecurrentHyperparams, SearchSpace, TrainingOptions,
};
use crate::preprocessing::{
    chronological_split, make_windows, MinMaxScaler, RangePolicy, WindowSet,
};
use chrono::NaiveDate;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Window length fed to the sequence models
    pub window_length: usize,
    /// Fraction of each instrument's windows used for training
    pub train_fraction: f64,
    /// Fraction of the training windows held out (chronological tail) for
    /// early stopping and model selection
    pub validation_fraction: f64,
    /// Two-sided confidence level for the uncertainty band
    pub confidence: f64,
    /// Rolling periods for feature engineering
    pub features: FeatureConfig,
    /// Search space for the recurrent variants
    pub search_space: SearchSpace,
    /// Shared training options
    pub training: TrainingOptions,
    /// Out-of-range behaviour of the fitted scaler
    pub range_policy: RangePolicy,
    /// Missing-value strategy for raw open/high/low
    pub impute_policy: ImputePolicy,
    /// Master seed for search, initialization and dropout
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_length: 50,
            train_fraction: 0.8,
            validation_fraction: 0.2,
            confidence: 0.95,
            features: FeatureConfig::default(),
            search_space: SearchSpace::default(),
            training: TrainingOptions::default(),
            range_policy: RangePolicy::default(),
            impute_policy: ImputePolicy::default(),
            seed: 42,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_length == 0 {
            return Err(PipelineError::TrainingConfiguration(
                "window_length must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("train_fraction", self.train_fraction),
            ("validation_fraction", self.validation_fraction),
            ("confidence", self.confidence),
        ] {
            if !(0.0..1.0).contains(&value) || value == 0.0 {
                return Err(PipelineError::TrainingConfiguration(format!(
                    "{} must be in (0, 1), got {}",
                    name, value
                )));
            }
        }
        self.search_space.validate()?;
        self.training.validate()
    }
}

/// Hyperparameters chosen by the search, with their validation losses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSelection {
    pub lstm: RecurrentHyperparams,
    pub lstm_val_loss: f64,
    pub gru: RecurrentHyperparams,
    pub gru_val_loss: f64,
    pub cnn_val_loss: f64,
}

/// The three trained forecasters plus selection metadata
#[derive(Debug)]
pub struct TrainedModels {
    pub lstm: LstmForecaster,
    pub gru: GruForecaster,
    pub cnn: ConvForecaster,
    pub selection: ModelSelection,
    /// Standard deviation of the ensemble's validation residuals
    /// (scaled units), used as the uncertainty floor
    pub residual_std: f64,
}

impl TrainedModels {
    /// Scaled predictions of all three members on a window set,
    /// in (lstm, gru, cnn) order
    pub fn member_predictions(&self, windows: &WindowSet) -> [Array1<f64>; 3] {
        [
            self.lstm.predict(windows),
            self.gru.predict(windows),
            self.cnn.predict(windows),
        ]
    }
}

/// Metrics for one named model on one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReport {
    pub name: String,
    pub metrics: RegressionReport,
}

/// Paired significance test between two models' price-unit predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedComparison {
    pub left: String,
    pub right: String,
    pub test: PairedTTest,
}

/// Evaluation record for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentReport {
    pub symbol: String,
    pub train_windows: usize,
    pub test_windows: usize,
    /// Persistence baseline on the held-out windows, price units
    pub baseline: RegressionReport,
    /// Per-model metrics, price units
    pub models: Vec<ModelReport>,
    /// Ensemble metrics, price units
    pub ensemble: RegressionReport,
    /// Confidence band around the ensemble, price units
    pub band: ConfidenceBand,
    /// Fraction of actual closes inside the band
    pub band_coverage: f64,
    pub comparisons: Vec<PairedComparison>,
}

/// Instrument that could not be evaluated, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedInstrument {
    pub symbol: String,
    pub reason: String,
}

/// Full pipeline output
#[derive(Debug, Serialize, Deserialize)]
pub struct PipelineReport {
    pub instruments: Vec<InstrumentReport>,
    pub skipped: Vec<SkippedInstrument>,
    pub selection: ModelSelection,
}

struct PreparedInstrument {
    symbol: String,
    fit: WindowSet,
    validation: WindowSet,
    test: WindowSet,
    train_total: usize,
}

/// Train the three forecasters on identical data with identical
/// early-stopping criteria.
///
/// Fails fast with a configuration error if the training set is empty or
/// the window shapes are inconsistent, before any model is fit.
pub fn train_models(
    train: &WindowSet,
    validation: &WindowSet,
    config: &PipelineConfig,
) -> Result<TrainedModels, PipelineError> {
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
    if train.num_features() != validation.num_features()
        || train.window_length() != validation.window_length()
    {
        return Err(PipelineError::TrainingConfiguration(format!(
            "inconsistent window shapes: train [{} x {}], validation [{} x {}]",
            train.window_length(),
            train.num_features(),
            validation.window_length(),
            validation.num_features()
        )));
    }

    let input_size = train.num_features();

    info!(
        "training on {} windows, validating on {} (window length {})",
        train.len(),
        validation.len(),
        train.window_length()
    );

    let lstm_outcome = random_search(
        &config.search_space,
        |hp, seed| LstmForecaster::new(input_size, hp.clone(), seed),
        train,
        validation,
        &config.training,
        config.seed,
    )?;
    info!(
        "lstm search done: val_loss={:.6}, layers={}, units={}",
        lstm_outcome.val_loss, lstm_outcome.hyperparams.num_layers, lstm_outcome.hyperparams.hidden_units
    );

    let gru_outcome = random_search(
        &config.search_space,
        |hp, seed| GruForecaster::new(input_size, hp.clone(), seed),
        train,
        validation,
        &config.training,
        config.seed.wrapping_add(10_000),
    )?;
    info!(
        "gru search done: val_loss={:.6}, layers={}, units={}",
        gru_outcome.val_loss, gru_outcome.hyperparams.num_layers, gru_outcome.hyperparams.hidden_units
    );

    let mut cnn = ConvForecaster::new(
        input_size,
        train.window_length(),
        config.seed.wrapping_add(20_000),
    )?;
    let cnn_summary = cnn.fit(train, validation, &config.training)?;
    info!("cnn training done: val_loss={:.6}", cnn_summary.best_val_loss);

    let lstm = lstm_outcome.model;
    let gru = gru_outcome.model;

    // Validation residuals of the ensemble feed the uncertainty floor
    let ensemble_val = combine(&[
        lstm.predict(validation),
        gru.predict(validation),
        cnn.predict(validation),
    ])?;
    let residuals: Vec<f64> = validation
        .y
        .iter()
        .zip(ensemble_val.iter())
        .map(|(t, p)| t - p)
        .collect();
    let residual_mean = residuals.iter().sum::<f64>() / residuals.len() as f64;
    let residual_std = if residuals.len() > 1 {
        (residuals
            .iter()
            .map(|r| (r - residual_mean).powi(2))
            .sum::<f64>()
            / (residuals.len() - 1) as f64)
            .sqrt()
    } else {
        0.0
    };

    Ok(TrainedModels {
        selection: ModelSelection {
            lstm: lstm_outcome.hyperparams,
            lstm_val_loss: lstm_outcome.val_loss,
            gru: gru_outcome.hyperparams,
            gru_val_loss: gru_outcome.val_loss,
            cnn_val_loss: cnn_summary.best_val_loss,
        },
        lstm,
        gru,
        cnn,
        residual_std,
    })
}

/// Run the full pipeline over a panel
pub fn run(mut panel: StockPanel, config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    config.validate()?;
    if panel.is_empty() {
        return Err(PipelineError::DataInsufficiency {
            needed: 1,
            got: 0,
            context: "panel instruments".to_string(),
        });
    }

    panel.impute_missing(config.impute_policy);

    // Feature engineering per instrument; the pooled rows fit the scaler
    let engineer = FeatureEngineer::with_config(config.features.clone());
    let mut skipped = Vec::new();
    let mut engineered = Vec::new();

    for series in &panel.series {
        match engineer.build_rows(series) {
            Ok(rows) => engineered.push((series.symbol.clone(), rows)),
            Err(e) => {
                warn!("skipping {}: {}", series.symbol, e);
                skipped.push(SkippedInstrument {
                    symbol: series.symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let pooled_rows: Vec<_> = engineered
        .iter()
        .flat_map(|(_, rows)| rows.iter().cloned())
        .collect();
    let scaler = MinMaxScaler::fit(&pooled_rows, config.range_policy)?;

    // Window and split each instrument; validation comes from the
    // chronological tail of the training windows, so no test window can
    // influence model selection
    let mut prepared = Vec::new();
    for (symbol, rows) in &engineered {
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        let matrix = scaler.transform(rows)?;
        let windows = make_windows(&matrix, &dates, config.window_length)?;

        let split = chronological_split(&windows, config.train_fraction)?;
        if split.test.is_empty() {
            warn!("skipping {}: no held-out windows", symbol);
            skipped.push(SkippedInstrument {
                symbol: symbol.clone(),
                reason: format!("{} windows leave an empty test set", windows.len()),
            });
            continue;
        }

        let inner = chronological_split(&split.train, 1.0 - config.validation_fraction)?;
        if inner.train.is_empty() || inner.test.is_empty() {
            warn!("skipping {}: training set too small for validation", symbol);
            skipped.push(SkippedInstrument {
                symbol: symbol.clone(),
                reason: format!(
                    "{} training windows cannot supply a validation slice",
                    split.train.len()
                ),
            });
            continue;
        }

        prepared.push(PreparedInstrument {
            symbol: symbol.clone(),
            train_total: split.train.len(),
            fit: inner.train,
            validation: inner.test,
            test: split.test,
        });
    }

    if prepared.is_empty() {
        return Err(PipelineError::DataInsufficiency {
            needed: 1,
            got: 0,
            context: "instruments with enough windows".to_string(),
        });
    }

    // Pool training windows across instruments; windows never cross an
    // instrument boundary
    let pooled_fit = WindowSet::concat(&prepared.iter().map(|p| &p.fit).collect::<Vec<_>>())?;
    let pooled_val =
        WindowSet::concat(&prepared.iter().map(|p| &p.validation).collect::<Vec<_>>())?;

    let models = train_models(&pooled_fit, &pooled_val, config)?;
    let estimator =
        UncertaintyEstimator::new(config.confidence)?.with_residual_std(models.residual_std);
    let baseline = PersistenceBaseline::new();

    // Evaluate each instrument inside its own loop iteration and collect
    // the records as we go
    let mut instruments = Vec::with_capacity(prepared.len());
    for item in &prepared {
        let member_preds = models.member_predictions(&item.test);
        let ensemble_scaled = combine(&member_preds)?;
        let band_scaled = estimator.band(&member_preds)?;
        let baseline_scaled = baseline.predict(&item.test);

        // Everything below is in price units
        let y_true = scaler.inverse_close(&item.test.y).to_vec();
        let baseline_prices = scaler.inverse_close(&baseline_scaled).to_vec();
        let member_prices: Vec<Vec<f64>> = member_preds
            .iter()
            .map(|p| scaler.inverse_close(p).to_vec())
            .collect();
        let ensemble_prices = scaler.inverse_close(&ensemble_scaled).to_vec();

        let band = ConfidenceBand {
            mean: scaler
                .inverse_close(&Array1::from(band_scaled.mean))
                .to_vec(),
            lower: scaler
                .inverse_close(&Array1::from(band_scaled.lower))
                .to_vec(),
            upper: scaler
                .inverse_close(&Array1::from(band_scaled.upper))
                .to_vec(),
        };
        let band_coverage = band.coverage(&y_true);

        let model_names = [models.lstm.name(), models.gru.name(), models.cnn.name()];
        let mut model_reports = Vec::with_capacity(member_prices.len());
        for (name, prices) in model_names.iter().zip(member_prices.iter()) {
            model_reports.push(ModelReport {
                name: name.to_string(),
                metrics: RegressionReport::compute(&y_true, prices)?,
            });
        }

        let mut comparisons = Vec::new();
        for i in 0..member_prices.len() {
            for j in (i + 1)..member_prices.len() {
                comparisons.push(PairedComparison {
                    left: model_names[i].to_string(),
                    right: model_names[j].to_string(),
                    test: paired_t_test(&member_prices[i], &member_prices[j])?,
                });
            }
        }

        let report = InstrumentReport {
            symbol: item.symbol.clone(),
            train_windows: item.train_total,
            test_windows: item.test.len(),
            baseline: RegressionReport::compute(&y_true, &baseline_prices)?,
            models: model_reports,
            ensemble: RegressionReport::compute(&y_true, &ensemble_prices)?,
            band,
            band_coverage,
            comparisons,
        };

        info!(
            "{}: baseline rmse={:.4}, ensemble rmse={:.4}, coverage={:.2}",
            report.symbol, report.baseline.rmse, report.ensemble.rmse, report.band_coverage
        );
        instruments.push(report);
    }

    Ok(PipelineReport {
        instruments,
        skipped,
        selection: models.selection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{random_walk_panel, random_walk_series, StockPanel};

    /// Shrunken search budget so the tests stay fast; the pipeline shape
    /// is identical to the defaults
    fn test_config() -> PipelineConfig {
        PipelineConfig {
            search_space: SearchSpace {
                num_layers: vec![1],
                hidden_units: vec![8],
                dropout_range: (0.2, 0.3),
                max_trials: 2,
            },
            training: TrainingOptions {
                epochs: 10,
                ..TrainingOptions::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_end_to_end_synthetic_scenario() {
        // 500-point zero-drift series: after the rolling warm-up drop,
        // windowing at 50 and the 80/20 split, the persistence baseline must
        // be finite and the ensemble must stay within 1.5x of it
        let panel = StockPanel::from_series(vec![
            random_walk_series("SYN", 500, 100.0, 0.0, 1.0, 42).unwrap()
        ])
        .unwrap();

        let report = run(panel, &test_config()).unwrap();
        assert_eq!(report.instruments.len(), 1);

        let inst = &report.instruments[0];
        assert!(inst.test_windows > 0);
        assert!(inst.baseline.rmse.is_finite());
        assert!(inst.baseline.rmse > 0.0);
        assert!(
            inst.ensemble.rmse <= 1.5 * inst.baseline.rmse,
            "ensemble rmse {} exceeds 1.5x baseline {}",
            inst.ensemble.rmse,
            inst.baseline.rmse
        );

        // Confidence band sanity: aligned, ordered, non-degenerate overall
        assert_eq!(inst.band.len(), inst.test_windows);
        let mut total_width = 0.0;
        for i in 0..inst.band.len() {
            assert!(inst.band.upper[i] >= inst.band.lower[i]);
            assert!(inst.band.mean[i].is_finite());
            total_width += inst.band.width(i);
        }
        assert!(total_width > 0.0);

        // Three pairwise comparisons with valid p-values
        assert_eq!(inst.comparisons.len(), 3);
        for c in &inst.comparisons {
            assert!((0.0..=1.0).contains(&c.test.p_value));
        }
    }

    #[test]
    fn test_short_instrument_is_skipped_not_fatal() {
        let long = random_walk_series("LONG", 400, 100.0, 0.0, 1.0, 5).unwrap();
        let short = random_walk_series("SHRT", 60, 50.0, 0.0, 1.0, 6).unwrap();
        let panel = StockPanel::from_series(vec![long, short]).unwrap();

        let report = run(panel, &test_config()).unwrap();
        assert_eq!(report.instruments.len(), 1);
        assert_eq!(report.instruments[0].symbol, "LONG");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].symbol, "SHRT");
    }

    #[test]
    fn test_multi_instrument_panel() {
        let panel = random_walk_panel(&["AAA", "BBB"], 350, 9).unwrap();
        let report = run(panel, &test_config()).unwrap();

        assert_eq!(report.instruments.len(), 2);
        for inst in &report.instruments {
            assert!(inst.baseline.rmse.is_finite());
            assert!(inst.ensemble.rmse.is_finite());
            assert_eq!(inst.models.len(), 3);
        }
    }

    #[test]
    fn test_empty_panel_rejected() {
        let panel = StockPanel::from_series(vec![]).unwrap();
        assert!(matches!(
            run(panel, &test_config()),
            Err(PipelineError::DataInsufficiency { .. })
        ));
    }

    #[test]
    fn test_train_models_fails_fast_on_empty_input() {
        let panel = random_walk_panel(&["AAA"], 200, 3).unwrap();
        let engineer = FeatureEngineer::new();
        let rows = engineer.build_rows(&panel.series[0]).unwrap();
        let scaler = MinMaxScaler::fit(&rows, RangePolicy::Clip).unwrap();
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        let matrix = scaler.transform(&rows).unwrap();
        let windows = make_windows(&matrix, &dates, 50).unwrap();

        let empty = windows.slice(0, 0);
        let val = windows.slice(0, 5);
        assert!(matches!(
            train_models(&empty, &val, &test_config()),
            Err(PipelineError::TrainingConfiguration(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let panel = random_walk_panel(&["AAA"], 200, 3).unwrap();
        let config = PipelineConfig {
            train_fraction: 1.2,
            ..test_config()
        };
        assert!(run(panel, &config).is_err());
    }
}
