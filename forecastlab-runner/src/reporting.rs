//! Run artifact export: snapshot JSON, forecast CSV, and a plot.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use forecastlab_core::domain::RunRecord;
use forecastlab_core::forecast::Forecast;

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub snapshot: PathBuf,
    pub values_csv: PathBuf,
    pub plot: PathBuf,
}

/// Writes all artifacts for a run into `<reports_dir>/<run_id>/`.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    reports_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(reports_dir: impl AsRef<Path>) -> Self {
        Self {
            reports_dir: reports_dir.as_ref().to_path_buf(),
        }
    }

    /// Save complete run artifacts.
    ///
    /// `actuals` are the held-out observations the forecast was scored
    /// against; empty for runs that failed before scoring.
    pub fn write_run(
        &self,
        record: &RunRecord,
        forecast: &Forecast,
        actuals: &[f64],
    ) -> Result<ArtifactPaths> {
        let run_dir = self.reports_dir.join(record.run_id.as_str());
        fs::create_dir_all(&run_dir).context("failed to create run report directory")?;

        let snapshot = run_dir.join("snapshot.json");
        write_snapshot(&snapshot, record)?;

        let values_csv = run_dir.join("forecast.csv");
        write_values_csv(&values_csv, forecast, actuals)?;

        let plot = run_dir.join("plot.svg");
        write_plot_svg(&plot, forecast, actuals)?;

        Ok(ArtifactPaths {
            dir: run_dir,
            snapshot,
            values_csv,
            plot,
        })
    }
}

fn write_snapshot(path: &Path, record: &RunRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("failed to serialize run record")?;
    fs::write(path, json).context("failed to write run snapshot")?;
    Ok(())
}

fn write_values_csv(path: &Path, forecast: &Forecast, actuals: &[f64]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("failed to open forecast CSV")?;
    writer.write_record(["horizon_step", "predicted", "actual"])?;
    for point in forecast.points() {
        let actual = actuals
            .get((point.step - 1) as usize)
            .map(|v| v.to_string())
            .unwrap_or_default();
        writer.write_record([point.step.to_string(), point.value.to_string(), actual])?;
    }
    writer.flush().context("failed to flush forecast CSV")?;
    Ok(())
}

const PLOT_WIDTH: f64 = 720.0;
const PLOT_HEIGHT: f64 = 360.0;
const PLOT_MARGIN: f64 = 40.0;

/// Minimal line plot of predicted vs actual, one point per horizon step.
fn write_plot_svg(path: &Path, forecast: &Forecast, actuals: &[f64]) -> Result<()> {
    let predicted = forecast.values();
    let all: Vec<f64> = predicted.iter().chain(actuals.iter()).copied().collect();

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{PLOT_WIDTH}\" height=\"{PLOT_HEIGHT}\" viewBox=\"0 0 {PLOT_WIDTH} {PLOT_HEIGHT}\">\n"
    ));
    svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");

    if !all.is_empty() {
        let lo = all.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = all.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = if (hi - lo).abs() < f64::EPSILON {
            1.0
        } else {
            hi - lo
        };
        let steps = predicted.len().max(actuals.len()).max(2);

        let project = |i: usize, v: f64| {
            let x = PLOT_MARGIN + (PLOT_WIDTH - 2.0 * PLOT_MARGIN) * i as f64 / (steps - 1) as f64;
            let y = PLOT_HEIGHT - PLOT_MARGIN
                - (PLOT_HEIGHT - 2.0 * PLOT_MARGIN) * (v - lo) / span;
            format!("{x:.1},{y:.1}")
        };

        for (values, color) in [(predicted.as_slice(), "#1f77b4"), (actuals, "#d62728")] {
            if values.len() < 2 {
                continue;
            }
            let points: Vec<String> = values
                .iter()
                .enumerate()
                .map(|(i, v)| project(i, *v))
                .collect();
            svg.push_str(&format!(
                "<polyline fill=\"none\" stroke=\"{color}\" stroke-width=\"1.5\" points=\"{}\"/>\n",
                points.join(" ")
            ));
        }
    }

    svg.push_str("</svg>\n");
    fs::write(path, svg).context("failed to write plot SVG")?;
    Ok(())
}

/// Markdown summary of a run, suitable for a chat message body or a
/// README-style run log.
pub fn run_summary_markdown(record: &RunRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("## Forecast run {}\n\n", record.run_id.short()));
    out.push_str(&format!(
        "- started: {}\n- strategy: {}\n- horizon: {}h\n- data: {}\n",
        record.timestamp.format("%Y-%m-%d %H:%M UTC"),
        record.strategy,
        record.horizon,
        record.data_source_tag(),
    ));
    match &record.metrics {
        Some(m) => {
            let mape = m
                .mape
                .value()
                .map(|v| format!("{v:.2}%"))
                .unwrap_or_else(|| "n/a".to_string());
            out.push_str(&format!(
                "- RMSE: {:.2}\n- MAE: {:.2}\n- MAPE: {}\n",
                m.rmse, m.mae, mape
            ));
        }
        None => out.push_str("- metrics: none (failed before scoring)\n"),
    }
    if !record.status.is_success() {
        out.push_str(&format!("- status: {}\n", record.status.as_str()));
    }
    out
}
