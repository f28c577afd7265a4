//! End-to-end pipeline tests: full runs without any real credentials,
//! exercising degradation, scoring, persistence, and notification.

use std::fs;

use forecastlab_core::domain::{DiagEvent, PersistStatus, RunStatus};
use forecastlab_core::forecast::Strategy;
use forecastlab_runner::notify::{NotificationPayload, Sink, SinkError};
use forecastlab_runner::orchestrator::{CancelToken, Orchestrator};
use forecastlab_runner::{PipelineConfig, RunStore};
use tempfile::TempDir;

fn test_config(tmp: &TempDir) -> PipelineConfig {
    PipelineConfig {
        store_dir: tmp.path().join("store"),
        reports_dir: tmp.path().join("reports"),
        staging_dir: tmp.path().join("staging"),
        ..PipelineConfig::default()
    }
}

struct FailingSink(&'static str);

impl Sink for FailingSink {
    fn name(&self) -> &str {
        self.0
    }

    fn send(&self, _payload: &NotificationPayload) -> Result<(), SinkError> {
        Err(SinkError::Network("connection refused".into()))
    }
}

struct CountingSink {
    sent: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl Sink for CountingSink {
    fn name(&self) -> &str {
        "counting"
    }

    fn send(&self, _payload: &NotificationPayload) -> Result<(), SinkError> {
        self.sent.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn naive_run_end_to_end_produces_constant_forecast() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let mut orchestrator = Orchestrator::from_config(&config).unwrap();

    let record = orchestrator.run(&config, &CancelToken::new());

    assert!(record.status.is_success());
    assert_eq!(record.persistence, PersistStatus::Committed);
    assert_eq!(record.horizon, config.horizon);
    assert_eq!(record.strategy, "naive");

    // Persistence forecast: every stored step carries the same value.
    let store = RunStore::new(tmp.path().join("store"), config.store_retries);
    let values = store.values_for(&record.run_id).unwrap();
    assert_eq!(values.len(), config.horizon as usize);
    let first = values[0].predicted_value;
    assert!(values.iter().all(|v| v.predicted_value == first));
    assert_eq!(values.last().unwrap().horizon_step, config.horizon);
}

#[test]
fn run_writes_report_artifacts_and_references_them() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let mut orchestrator = Orchestrator::from_config(&config).unwrap();

    let record = orchestrator.run(&config, &CancelToken::new());

    let report = record.report_reference.as_deref().expect("report written");
    assert!(report.ends_with("plot.svg"));
    assert!(fs::metadata(report).is_ok());

    let run_dir = tmp.path().join("reports").join(record.run_id.as_str());
    assert!(run_dir.join("snapshot.json").exists());
    let csv = fs::read_to_string(run_dir.join("forecast.csv")).unwrap();
    assert!(csv.starts_with("horizon_step,predicted,actual"));
    // Header plus one row per horizon step.
    assert_eq!(csv.lines().count(), config.horizon as usize + 1);
}

#[test]
fn seasonal_naive_run_succeeds_with_synthetic_data() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.strategy = Strategy::SeasonalNaive { period: 24 };
    let mut orchestrator = Orchestrator::from_config(&config).unwrap();

    let record = orchestrator.run(&config, &CancelToken::new());

    assert!(record.status.is_success());
    assert_eq!(record.strategy, "seasonal_naive");
    // The synthetic series has a daily cycle, so seasonal-naive should
    // not collapse to a constant line.
    let store = RunStore::new(tmp.path().join("store"), config.store_retries);
    let values = store.values_for(&record.run_id).unwrap();
    let first = values[0].predicted_value;
    assert!(values.iter().any(|v| v.predicted_value != first));
}

#[test]
fn all_sinks_failing_still_yields_a_successful_run() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let mut orchestrator = Orchestrator::from_config(&config)
        .unwrap()
        .with_sink(Box::new(FailingSink("chat")))
        .with_sink(Box::new(FailingSink("document")));

    let record = orchestrator.run(&config, &CancelToken::new());

    assert!(record.status.is_success());
    assert_eq!(record.persistence, PersistStatus::Committed);
    let mut failed = record.diagnostics.failed_sinks();
    failed.sort();
    assert_eq!(failed, vec!["chat", "document"]);
}

#[test]
fn failed_run_still_notifies_with_empty_metrics() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.history_hours = 2;
    let sent = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut orchestrator = Orchestrator::from_config(&config)
        .unwrap()
        .with_sink(Box::new(CountingSink { sent: sent.clone() }));

    let record = orchestrator.run(&config, &CancelToken::new());

    assert!(!record.status.is_success());
    assert!(record.metrics.is_none());
    assert_eq!(sent.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn persist_failure_does_not_fail_the_run() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.store_dir = "/proc/no-such-dir/store".into();
    config.store_retries = 0;
    let mut orchestrator = Orchestrator::from_config(&config).unwrap();

    let record = orchestrator.run(&config, &CancelToken::new());

    assert!(record.status.is_success());
    assert_eq!(record.persistence, PersistStatus::PersistFailed);
    assert!(record.metrics.is_some());
}

#[test]
fn two_runs_append_two_history_rows() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let mut orchestrator = Orchestrator::from_config(&config).unwrap();

    let first = orchestrator.run(&config, &CancelToken::new());
    let second = orchestrator.run(&config, &CancelToken::new());
    assert_ne!(first.run_id, second.run_id);

    let store = RunStore::new(tmp.path().join("store"), config.store_retries);
    let runs = store.list_recent(10).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].run_id, second.run_id.as_str());
}

#[test]
fn degraded_sources_are_recorded_per_signal() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let mut orchestrator = Orchestrator::from_config(&config).unwrap();

    let record = orchestrator.run(&config, &CancelToken::new());

    assert_eq!(record.data_sources.len(), 2);
    assert_eq!(record.data_source_tag(), "synthetic");
    let degradations = record
        .diagnostics
        .events()
        .iter()
        .filter(|e| matches!(e, DiagEvent::SourceDegraded { .. }))
        .count();
    assert_eq!(degradations, 2);
}

#[test]
fn cancellation_before_start_leaves_a_failed_record() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let mut orchestrator = Orchestrator::from_config(&config).unwrap();

    let token = CancelToken::new();
    token.cancel();
    let record = orchestrator.run(&config, &token);

    assert_eq!(
        record.status,
        RunStatus::Failed {
            error_kind: "cancelled".to_string()
        }
    );
    // Even a cancelled run is committed best-effort.
    let store = RunStore::new(tmp.path().join("store"), config.store_retries);
    assert_eq!(store.list_recent(10).unwrap().len(), 1);
}

#[test]
fn config_file_roundtrip_drives_a_run() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("forecastlab.toml");
    fs::write(
        &config_path,
        format!(
            r#"
horizon = 6
history_hours = 72
store_dir = "{store}"
reports_dir = "{reports}"
staging_dir = "{staging}"

[strategy]
type = "naive"
"#,
            store = tmp.path().join("store").display(),
            reports = tmp.path().join("reports").display(),
            staging = tmp.path().join("staging").display(),
        ),
    )
    .unwrap();

    let config = PipelineConfig::load(&config_path).unwrap();
    assert_eq!(config.horizon, 6);

    let mut orchestrator = Orchestrator::from_config(&config).unwrap();
    let record = orchestrator.run(&config, &CancelToken::new());
    assert!(record.status.is_success());
    assert_eq!(record.horizon, 6);
}
