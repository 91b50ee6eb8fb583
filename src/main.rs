//! Pipeline runner
//!
//! Loads a daily OHLCV panel from CSV (or generates a synthetic one),
//! runs the full forecasting pipeline, and prints per-instrument metrics,
//! confidence-band coverage and pairwise significance tests.
//!
//! Usage:
//!     cargo run --release -- --data data/all_stocks_5yr.csv --symbols AAPL,MSFT
//!     cargo run --release -- --synthetic 750

use anyhow::Result;
use clap::Parser;
use ensemble_forecast::data::{load_panel, random_walk_panel, StockPanel};
use ensemble_forecast::pipeline::{run, InstrumentReport, PipelineConfig};
use ensemble_forecast::model::{SearchSpace, TrainingOptions};
use ensemble_forecast::InstrumentSeries;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Train the forecaster ensemble and print the evaluation report
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV panel path (date,open,high,low,close,volume,Name)
    #[arg(short, long)]
    data: Option<String>,

    /// Comma-separated symbols to evaluate (default: all in the panel)
    #[arg(short, long)]
    symbols: Option<String>,

    /// Generate a synthetic panel of this length instead of loading a file
    #[arg(long, default_value_t = 750)]
    synthetic: usize,

    /// Window length fed to the sequence models
    #[arg(short, long, default_value_t = 50)]
    window: usize,

    /// Training fraction of each instrument's windows
    #[arg(long, default_value_t = 0.8)]
    train_fraction: f64,

    /// Epoch budget per training run
    #[arg(short, long, default_value_t = 30)]
    epochs: usize,

    /// Hyperparameter search trials per recurrent variant
    #[arg(short, long, default_value_t = 10)]
    trials: usize,

    /// Master seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print the full report as JSON instead of tables
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    println!("\n{}", "=".repeat(64));
    println!("  Ensemble Forecast: LSTM + GRU + CNN");
    println!("{}\n", "=".repeat(64));

    let panel = load_or_generate(&args)?;
    println!(
        "Panel: {} instruments, {} bars total\n",
        panel.len(),
        panel.total_bars()
    );

    let config = PipelineConfig {
        window_length: args.window,
        train_fraction: args.train_fraction,
        search_space: SearchSpace {
            max_trials: args.trials,
            ..SearchSpace::default()
        },
        training: TrainingOptions {
            epochs: args.epochs,
            ..TrainingOptions::default()
        },
        seed: args.seed,
        ..PipelineConfig::default()
    };

    let report = run(panel, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\nSelected hyperparameters:");
    println!(
        "  lstm: layers={}, units={}, dropout={:.2} (val loss {:.6})",
        report.selection.lstm.num_layers,
        report.selection.lstm.hidden_units,
        report.selection.lstm.dropout,
        report.selection.lstm_val_loss
    );
    println!(
        "  gru:  layers={}, units={}, dropout={:.2} (val loss {:.6})",
        report.selection.gru.num_layers,
        report.selection.gru.hidden_units,
        report.selection.gru.dropout,
        report.selection.gru_val_loss
    );
    println!("  cnn:  fixed architecture (val loss {:.6})", report.selection.cnn_val_loss);

    for inst in &report.instruments {
        print_instrument(inst);
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped instruments:");
        for s in &report.skipped {
            println!("  {} - {}", s.symbol, s.reason);
        }
    }

    Ok(())
}

fn load_or_generate(args: &Args) -> Result<StockPanel> {
    let panel = match &args.data {
        Some(path) => load_panel(path)?,
        None => {
            println!("No data file given; using a synthetic random-walk panel");
            random_walk_panel(&["SYN_A", "SYN_B"], args.synthetic, args.seed)?
        }
    };

    let panel = match &args.symbols {
        Some(list) => {
            let wanted: Vec<&str> = list.split(',').map(|s| s.trim()).collect();
            let series: Vec<InstrumentSeries> = panel
                .series
                .into_iter()
                .filter(|s| wanted.contains(&s.symbol.as_str()))
                .collect();
            StockPanel::from_series(series)?
        }
        None => panel,
    };

    Ok(panel)
}

fn print_instrument(inst: &InstrumentReport) {
    println!("\n{}", "-".repeat(64));
    println!(
        "{} ({} train / {} test windows)",
        inst.symbol, inst.train_windows, inst.test_windows
    );
    println!("{}", "-".repeat(64));

    println!(
        "  {:<10} {:>10} {:>10} {:>10} {:>8}",
        "model", "RMSE", "MAE", "MAPE%", "R2"
    );
    println!(
        "  {:<10} {:>10.4} {:>10.4} {:>10.2} {:>8.3}",
        "baseline", inst.baseline.rmse, inst.baseline.mae, inst.baseline.mape, inst.baseline.r2
    );
    for m in &inst.models {
        println!(
            "  {:<10} {:>10.4} {:>10.4} {:>10.2} {:>8.3}",
            m.name, m.metrics.rmse, m.metrics.mae, m.metrics.mape, m.metrics.r2
        );
    }
    println!(
        "  {:<10} {:>10.4} {:>10.4} {:>10.2} {:>8.3}",
        "ensemble", inst.ensemble.rmse, inst.ensemble.mae, inst.ensemble.mape, inst.ensemble.r2
    );

    println!("  95% band coverage: {:.1}%", inst.band_coverage * 100.0);

    println!("  Paired t-tests:");
    for c in &inst.comparisons {
        println!(
            "    {} vs {}: t={:+.3}, p={:.4}{}",
            c.left,
            c.right,
            c.test.statistic,
            c.test.p_value,
            if c.test.is_significant() { " *" } else { "" }
        );
    }
}
