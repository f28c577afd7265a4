//! ForecastLab CLI — run, history, and fetch commands.
//!
//! Commands:
//! - `run` — execute one forecast pipeline run from a TOML config file
//! - `history` — list recent runs from the run store
//! - `fetch` — collect one signal and print what came back

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use forecastlab_core::domain::TimeRange;
use forecastlab_core::forecast::Strategy;
use forecastlab_runner::orchestrator::{CancelToken, Orchestrator};
use forecastlab_runner::reporting::run_summary_markdown;
use forecastlab_runner::{PipelineConfig, RunStore};

#[derive(Parser)]
#[command(
    name = "forecastlab",
    about = "ForecastLab CLI — forecast pipeline orchestration"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one pipeline run: collect, prepare, forecast, score,
    /// persist, notify.
    Run {
        /// Override the configured forecast horizon (steps).
        #[arg(long)]
        horizon: Option<u32>,

        /// Override the configured strategy: naive, seasonal_naive, or a
        /// registered model name.
        #[arg(long)]
        strategy: Option<String>,

        /// Print the full run record as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List recent runs from the run store.
    History {
        /// Number of runs to show, most recent first.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Collect one configured signal and print what came back.
    Fetch {
        /// Signal id (e.g. spot_price, temperature).
        signal: String,

        /// Hours of trailing history to request.
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            horizon,
            strategy,
            json,
        } => run_pipeline(config, horizon, strategy, json),
        Commands::History { limit } => show_history(&config, limit),
        Commands::Fetch { signal, hours } => fetch_signal(&config, &signal, hours),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => Ok(PipelineConfig::load(path)?),
        None => {
            let mut config = PipelineConfig::default();
            config.credentials.overlay_env();
            Ok(config)
        }
    }
}

fn run_pipeline(
    mut config: PipelineConfig,
    horizon: Option<u32>,
    strategy: Option<String>,
    json: bool,
) -> Result<()> {
    if let Some(horizon) = horizon {
        if horizon == 0 {
            bail!("--horizon must be at least 1");
        }
        config.horizon = horizon;
    }
    if let Some(name) = strategy {
        config.strategy = parse_strategy(&name, config.season_period);
    }

    let mut orchestrator = Orchestrator::from_config(&config)?;
    let record = orchestrator.run(&config, &CancelToken::new());

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", run_summary_markdown(&record));
    }

    if !record.status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_strategy(name: &str, season_period: usize) -> Strategy {
    match name {
        "naive" => Strategy::Naive,
        "seasonal_naive" => Strategy::SeasonalNaive {
            period: season_period,
        },
        other => Strategy::Registered {
            name: other.to_string(),
        },
    }
}

fn show_history(config: &PipelineConfig, limit: usize) -> Result<()> {
    let store = RunStore::new(&config.store_dir, config.store_retries);
    let runs = store.list_recent(limit)?;
    if runs.is_empty() {
        println!("no runs recorded yet");
        return Ok(());
    }

    println!(
        "{:<14} {:<18} {:>4} {:>9} {:>8} {:>8} {:>8}  {}",
        "run", "time", "h", "data", "rmse", "mae", "mape", "status"
    );
    for run in runs {
        println!(
            "{:<14} {:<18} {:>4} {:>9} {:>8} {:>8} {:>8}  {}",
            &run.run_id[..run.run_id.len().min(12)],
            run.timestamp.format("%Y-%m-%d %H:%M"),
            run.horizon,
            run.data_source_tag,
            fmt_metric(run.rmse),
            fmt_metric(run.mae),
            fmt_metric(run.mape),
            run.status,
        );
    }
    Ok(())
}

fn fmt_metric(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

fn fetch_signal(config: &PipelineConfig, signal: &str, hours: i64) -> Result<()> {
    let Some(_spec) = config.signals.iter().find(|s| s.id.as_str() == signal) else {
        let known: Vec<&str> = config.signals.iter().map(|s| s.id.as_str()).collect();
        bail!("unknown signal '{signal}' (configured: {})", known.join(", "));
    };

    // A one-signal config reuses the orchestrator's adapter wiring.
    let mut narrowed = config.clone();
    narrowed.signals.retain(|s| s.id.as_str() == signal);
    narrowed.target_signal = narrowed.signals[0].id.clone();
    let orchestrator = Orchestrator::from_config(&narrowed)?;

    let now = chrono::Utc::now().naive_utc();
    let range = TimeRange::trailing_hours(now, hours);
    for (outcome, events) in orchestrator.fetch_all(&range) {
        let series = outcome.series();
        println!(
            "{}: {} points ({})",
            signal,
            series.len(),
            outcome.provenance().as_str()
        );
        if let Some(last) = series.last() {
            println!("last: {} = {:.2}", last.timestamp, last.value);
        }
        for event in events {
            println!("note: {}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}
