//! Pipeline orchestrator: collection → preparation → forecasting →
//! scoring → persistence → notification.
//!
//! The orchestrator always returns a `RunRecord`. Source trouble degrades
//! to synthetic data, sink trouble is logged, store trouble downgrades
//! persistence — only insufficient history, a missing target, a model
//! failure, or a length mismatch at scoring move the run to `Failed`,
//! and even then the partial record is committed best-effort.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Timelike, Utc};
use rayon::prelude::*;
use thiserror::Error;

use forecastlab_core::domain::{
    DiagEvent, DiagnosticLog, ObservationSeries, RunId, RunRecord, RunStatus, SignalId, TimeRange,
};
use forecastlab_core::features::{self, FeatureOptions};
use forecastlab_core::forecast::{self, Forecast, ForecastError, ModelRegistry};
use forecastlab_core::score;
use forecastlab_core::sources::{
    OpenWeatherProvider, Provider, ProviderKind, SourceAdapter, SourceOutcome, SpotPriceProvider,
    SyntheticGenerator,
};

use crate::config::PipelineConfig;
use crate::notify::{self, ArtifactRepoSink, ChatSink, DocumentSink, Sink, SinkOutcome};
use crate::reporting::ArtifactWriter;
use crate::store::RunStore;

// Fallback site for the weather provider when none is configured.
const DEFAULT_LATITUDE: f64 = 55.68;
const DEFAULT_LONGITUDE: f64 = 12.57;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("target signal '{0}' is not among the configured signals")]
    TargetNotConfigured(SignalId),
}

/// Cooperative cancellation flag, checked between pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stage the pipeline is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Collecting,
    Preparing,
    Forecasting,
    Scoring,
    Persisting,
    Notifying,
    Done,
    Failed,
}

pub struct Orchestrator {
    adapters: Vec<SourceAdapter>,
    registry: ModelRegistry,
    store: RunStore,
    sinks: Vec<Box<dyn Sink>>,
    artifacts: ArtifactWriter,
    /// Enabled sinks that could not be constructed (missing credentials);
    /// reported once per run.
    skipped_sinks: Vec<String>,
    /// Notes from setup that belong in every run's diagnostics.
    setup_notes: Vec<String>,
}

impl Orchestrator {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, SetupError> {
        if !config.signals.iter().any(|s| s.id == config.target_signal) {
            return Err(SetupError::TargetNotConfigured(config.target_signal.clone()));
        }

        let mut setup_notes = Vec::new();
        let mut adapters = Vec::new();
        for spec in &config.signals {
            let provider: Option<Box<dyn Provider>> =
                match config.credentials.by_name(&spec.credential) {
                    Some(key) => match build_provider(&spec.provider, key) {
                        Ok(provider) => Some(provider),
                        Err(reason) => {
                            setup_notes
                                .push(format!("provider for '{}' unavailable: {reason}", spec.id));
                            None
                        }
                    },
                    None => None,
                };
            adapters.push(
                SourceAdapter::new(
                    spec.id.clone(),
                    provider,
                    SyntheticGenerator::default(),
                    config.cadence_hours,
                )
                .with_staging(&config.staging_dir),
            );
        }

        let (sinks, skipped_sinks) = build_sinks(config);

        Ok(Self {
            adapters,
            registry: ModelRegistry::new(),
            store: RunStore::new(&config.store_dir, config.store_retries),
            sinks,
            artifacts: ArtifactWriter::new(&config.reports_dir),
            skipped_sinks,
            setup_notes,
        })
    }

    /// Register a forecasting model for the `registered` strategy.
    pub fn with_model(mut self, model: Box<dyn forecast::ForecastModel>) -> Self {
        self.registry.register(model);
        self
    }

    /// Add a sink beyond the configured set.
    pub fn with_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Collect every configured signal once, outside a pipeline run.
    pub fn fetch_all(&self, range: &TimeRange) -> Vec<(SourceOutcome, Vec<DiagEvent>)> {
        self.adapters.iter().map(|a| a.fetch(range)).collect()
    }

    /// Execute one pipeline run end to end.
    pub fn run(&mut self, config: &PipelineConfig, cancel: &CancelToken) -> RunRecord {
        let started_at = Utc::now();
        let run_id = RunId::generate(started_at, &config.config_hash());
        let mut record = RunRecord::started(run_id, started_at, config.horizon, config.strategy.name());
        let mut diag = DiagnosticLog::new();
        for note in &self.setup_notes {
            diag.info(note.clone());
        }
        for sink in &self.skipped_sinks {
            diag.info(format!("sink '{sink}' enabled but not configured; skipping"));
        }

        let now = started_at.naive_utc();
        let origin = now.with_minute(0).and_then(|t| t.with_second(0)).unwrap_or(now);
        let range = TimeRange::trailing_hours(origin, config.history_hours);

        let mut state = PipelineState::Collecting;
        let mut series_by_signal: BTreeMap<SignalId, ObservationSeries> = BTreeMap::new();
        let mut table = forecastlab_core::features::FeatureTable::empty();
        let mut forecast_result: Option<Forecast> = None;
        let mut actuals: Vec<f64> = Vec::new();

        loop {
            if cancel.is_cancelled() && state != PipelineState::Done && state != PipelineState::Failed {
                record.status = RunStatus::Failed {
                    error_kind: "cancelled".to_string(),
                };
                state = PipelineState::Failed;
            }

            match state {
                PipelineState::Collecting => {
                    // Fan out across sources; results are re-sorted by
                    // signal id so completion order never shows through.
                    let mut fetched: Vec<(SignalId, _)> = self
                        .adapters
                        .par_iter()
                        .map(|adapter| (adapter.signal().clone(), adapter.fetch(&range)))
                        .collect();
                    fetched.sort_by(|a, b| a.0.cmp(&b.0));

                    for (signal, (outcome, events)) in fetched {
                        diag.extend(events);
                        record.data_sources.insert(signal.clone(), outcome.provenance());
                        series_by_signal.insert(signal, outcome.into_series());
                    }
                    state = PipelineState::Preparing;
                }

                PipelineState::Preparing => {
                    let opts = FeatureOptions {
                        cadence_hours: config.cadence_hours,
                        lag_set: config.lag_set.clone(),
                        max_ffill_run: config.max_ffill_run,
                    };
                    let (built, events) =
                        features::build(&series_by_signal, &config.target_signal, &opts);
                    diag.extend(events);
                    table = built;
                    state = PipelineState::Forecasting;
                }

                PipelineState::Forecasting => {
                    // The last `horizon` rows are held out as actuals, so
                    // a scoreable run needs strictly more rows than that.
                    let needed = config.horizon as usize + 1;
                    if table.len() < needed {
                        record.status = RunStatus::Failed {
                            error_kind: "insufficient_history".to_string(),
                        };
                        diag.info(format!(
                            "insufficient history: need {needed} rows, have {}",
                            table.len()
                        ));
                        state = PipelineState::Failed;
                        continue;
                    }
                    match forecast::forecast(
                        &table,
                        config.target_signal.as_str(),
                        config.horizon,
                        &config.strategy,
                        &mut self.registry,
                    ) {
                        Ok(fc) => {
                            forecast_result = Some(fc);
                            state = PipelineState::Scoring;
                        }
                        Err(err) => {
                            record.status = RunStatus::Failed {
                                error_kind: forecast_error_kind(&err).to_string(),
                            };
                            diag.info(err.to_string());
                            state = PipelineState::Failed;
                        }
                    }
                }

                PipelineState::Scoring => {
                    let fc = forecast_result
                        .as_ref()
                        .cloned()
                        .unwrap_or_else(|| Forecast::from_values(Vec::new()));
                    actuals = table
                        .column_tail(config.target_signal.as_str(), config.horizon as usize)
                        .map(<[f64]>::to_vec)
                        .unwrap_or_default();
                    match score::score(&fc, &actuals) {
                        Ok(metrics) => {
                            record.metrics = Some(metrics);
                            state = PipelineState::Persisting;
                        }
                        Err(err) => {
                            record.status = RunStatus::Failed {
                                error_kind: score_error_kind(&err).to_string(),
                            };
                            diag.info(err.to_string());
                            state = PipelineState::Failed;
                        }
                    }
                }

                PipelineState::Persisting => {
                    if let Some(fc) = &forecast_result {
                        match self.artifacts.write_run(&record, fc, &actuals) {
                            Ok(paths) => {
                                record.report_reference =
                                    Some(paths.plot.to_string_lossy().into_owned());
                            }
                            Err(err) => diag.info(format!("artifact export failed: {err:#}")),
                        }
                    }
                    self.commit(&mut record, forecast_result.as_ref(), &mut diag);
                    state = PipelineState::Notifying;
                }

                PipelineState::Notifying => {
                    self.notify(&record, &mut diag);
                    record.status = RunStatus::Success;
                    state = PipelineState::Done;
                }

                PipelineState::Failed => {
                    // Best-effort partial commit so a failed run still
                    // leaves a trace in the history, then notify.
                    self.commit(&mut record, forecast_result.as_ref(), &mut diag);
                    self.notify(&record, &mut diag);
                    break;
                }

                PipelineState::Done => break,
            }
        }

        record.diagnostics = diag;
        record
    }

    fn commit(&self, record: &mut RunRecord, forecast: Option<&Forecast>, diag: &mut DiagnosticLog) {
        record.diagnostics = diag.clone();
        match self.store.commit(record, forecast, diag) {
            Ok(_) => record.persistence = forecastlab_core::domain::PersistStatus::Committed,
            Err(err) => {
                diag.info(format!("run store commit failed: {err}"));
                record.persistence = forecastlab_core::domain::PersistStatus::PersistFailed;
            }
        }
    }

    fn notify(&self, record: &RunRecord, diag: &mut DiagnosticLog) {
        if self.sinks.is_empty() {
            return;
        }
        let payload = notify::NotificationPayload::from_record(record);
        for outcome in notify::dispatch(&payload, &self.sinks) {
            if let SinkOutcome::Failed { sink, reason } = outcome {
                diag.push(DiagEvent::SinkFailed { sink, reason });
            }
        }
    }
}

fn score_error_kind(err: &score::ScoreError) -> &'static str {
    match err {
        score::ScoreError::LengthMismatch { .. } => "length_mismatch",
        score::ScoreError::EmptyForecast => "empty_forecast",
    }
}

fn forecast_error_kind(err: &ForecastError) -> &'static str {
    match err {
        ForecastError::InsufficientHistory { .. } => "insufficient_history",
        ForecastError::MissingTarget(_) => "missing_target",
        ForecastError::UnknownModel(_) => "unknown_model",
        ForecastError::Model { .. } => "model_failure",
    }
}

fn build_provider(kind: &ProviderKind, key: &str) -> Result<Box<dyn Provider>, String> {
    match kind {
        ProviderKind::SpotPrice => SpotPriceProvider::new(key)
            .map(|p| Box::new(p) as Box<dyn Provider>)
            .map_err(|e| e.to_string()),
        ProviderKind::OpenWeather => {
            OpenWeatherProvider::new(key, DEFAULT_LATITUDE, DEFAULT_LONGITUDE)
                .map(|p| Box::new(p) as Box<dyn Provider>)
                .map_err(|e| e.to_string())
        }
    }
}

/// Build the sinks named in `sinks_enabled` whose credentials resolved;
/// the rest come back as skipped names.
fn build_sinks(config: &PipelineConfig) -> (Vec<Box<dyn Sink>>, Vec<String>) {
    let creds = &config.credentials;
    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
    let mut skipped = Vec::new();

    for name in &config.sinks_enabled {
        // A sink whose credentials are missing or whose HTTP client
        // cannot be built is skipped, never silently downgraded.
        match name.as_str() {
            "chat" => match (&creds.chat_token, &creds.chat_channel) {
                (Some(token), Some(channel)) => match ChatSink::new(token, channel) {
                    Ok(sink) => sinks.push(Box::new(sink)),
                    Err(_) => skipped.push(name.clone()),
                },
                _ => skipped.push(name.clone()),
            },
            "document" => match (&creds.document_token, &creds.document_database_id) {
                (Some(token), Some(db)) => match DocumentSink::new(token, db) {
                    Ok(sink) => sinks.push(Box::new(sink)),
                    Err(_) => skipped.push(name.clone()),
                },
                _ => skipped.push(name.clone()),
            },
            "artifact_repo" => match (&creds.artifact_repo_token, &creds.artifact_repo) {
                (Some(token), Some(repo)) => match ArtifactRepoSink::new(token, repo) {
                    Ok(mut sink) => {
                        if let Some(branch) = &creds.artifact_repo_branch {
                            sink = sink.with_branch(branch);
                        }
                        if let (Some(n), Some(e)) = (&creds.committer_name, &creds.committer_email)
                        {
                            sink = sink.with_committer(n, e);
                        }
                        sinks.push(Box::new(sink));
                    }
                    Err(_) => skipped.push(name.clone()),
                },
                _ => skipped.push(name.clone()),
            },
            _ => skipped.push(name.clone()),
        }
    }
    (sinks, skipped)
}
