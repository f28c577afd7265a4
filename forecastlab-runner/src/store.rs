//! Run store — JSONL append-only persistence for run history.
//!
//! Two append-only relations as sibling files, joined on `run_id`:
//! - `forecast_runs.jsonl` — one summary row per run
//! - `forecast_values.jsonl` — one row per forecast horizon step
//!
//! Commits are idempotent per run id and serialized behind a mutex so two
//! concurrent runs can never interleave a partial write. Each line is an
//! independent JSON object; malformed lines are skipped on read rather
//! than poisoning the whole history.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use forecastlab_core::domain::{DiagEvent, DiagnosticLog, RunId, RunRecord};
use forecastlab_core::forecast::Forecast;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Stored summary row for one run (`forecast_runs` relation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRun {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub horizon: u32,
    pub data_source_tag: String,
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
    /// None both for failed runs and for an undefined MAPE.
    pub mape: Option<f64>,
    pub status: String,
}

impl StoredRun {
    fn from_record(record: &RunRecord) -> Self {
        Self {
            run_id: record.run_id.to_string(),
            timestamp: record.timestamp,
            horizon: record.horizon,
            data_source_tag: record.data_source_tag().to_string(),
            rmse: record.metrics.map(|m| m.rmse),
            mae: record.metrics.map(|m| m.mae),
            mape: record.metrics.and_then(|m| m.mape.value()),
            status: record.status.as_str().to_string(),
        }
    }
}

/// Stored forecast step (`forecast_values` relation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    pub run_id: String,
    pub horizon_step: u32,
    pub predicted_value: f64,
}

/// Append-only run store rooted at one directory.
pub struct RunStore {
    runs_path: PathBuf,
    values_path: PathBuf,
    /// Guards the check-then-append critical section of one commit.
    write_lock: Mutex<()>,
    max_retries: u32,
    base_delay: Duration,
}

impl RunStore {
    pub fn new(dir: impl AsRef<Path>, max_retries: u32) -> Self {
        let dir = dir.as_ref();
        Self {
            runs_path: dir.join("forecast_runs.jsonl"),
            values_path: dir.join("forecast_values.jsonl"),
            write_lock: Mutex::new(()),
            max_retries,
            base_delay: Duration::from_millis(100),
        }
    }

    /// Persist one run and its forecast values.
    ///
    /// Idempotent: if `run_id` is already present, nothing is appended and
    /// the same id is returned. Transient write failures are retried with
    /// exponential backoff (recorded in `diag`); exhausting the retries
    /// surfaces a `StoreError`, which the orchestrator maps to
    /// `persist_failed` — never to run failure.
    pub fn commit(
        &self,
        record: &RunRecord,
        forecast: Option<&Forecast>,
        diag: &mut DiagnosticLog,
    ) -> Result<RunId, StoreError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");

        if self.contains(&record.run_id)? {
            return Ok(record.run_id.clone());
        }

        let run_line = serde_json::to_string(&StoredRun::from_record(record))?;
        let mut value_lines = Vec::new();
        if let Some(forecast) = forecast {
            for point in forecast.points() {
                value_lines.push(serde_json::to_string(&StoredValue {
                    run_id: record.run_id.to_string(),
                    horizon_step: point.step,
                    predicted_value: point.value,
                })?);
            }
        }

        let mut attempt = 0;
        loop {
            match self.append_all(&run_line, &value_lines) {
                Ok(()) => return Ok(record.run_id.clone()),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    diag.push(DiagEvent::StoreRetry {
                        attempt,
                        reason: e.to_string(),
                    });
                    std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn append_all(&self, run_line: &str, value_lines: &[String]) -> io::Result<()> {
        if let Some(parent) = self.runs_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Values first: the run row is the commit marker the idempotence
        // check keys on, so it must land last.
        if !value_lines.is_empty() {
            let mut values = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.values_path)?;
            for line in value_lines {
                writeln!(values, "{line}")?;
            }
            values.flush()?;
        }

        let mut runs = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.runs_path)?;
        writeln!(runs, "{run_line}")?;
        runs.flush()?;
        Ok(())
    }

    fn contains(&self, run_id: &RunId) -> Result<bool, StoreError> {
        Ok(self
            .read_runs()?
            .iter()
            .any(|r| r.run_id == run_id.as_str()))
    }

    /// Most recent runs first.
    pub fn list_recent(&self, n: usize) -> Result<Vec<StoredRun>, StoreError> {
        let mut runs = self.read_runs()?;
        runs.reverse();
        runs.truncate(n);
        Ok(runs)
    }

    /// Forecast values for one run, in horizon-step order.
    pub fn values_for(&self, run_id: &RunId) -> Result<Vec<StoredValue>, StoreError> {
        if !self.values_path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.values_path)?;
        let mut values: Vec<StoredValue> = io::BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .filter(|v: &StoredValue| v.run_id == run_id.as_str())
            .collect();
        values.sort_by_key(|v| v.horizon_step);
        Ok(values)
    }

    fn read_runs(&self) -> Result<Vec<StoredRun>, StoreError> {
        if !self.runs_path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.runs_path)?;
        Ok(io::BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecastlab_core::domain::{Provenance, SignalId};
    use forecastlab_core::score::{Mape, Metrics};
    use tempfile::TempDir;

    fn record(id: &[u8]) -> RunRecord {
        let mut rec = RunRecord::started(RunId::from_bytes(id), Utc::now(), 3, "naive");
        rec.data_sources
            .insert(SignalId::from("spot_price"), Provenance::Synthetic);
        rec.metrics = Some(Metrics {
            rmse: 1.0,
            mae: 0.5,
            mape: Mape::Defined(2.0),
        });
        rec
    }

    fn forecast() -> Forecast {
        Forecast::from_values(vec![10.0, 11.0, 12.0])
    }

    #[test]
    fn commit_then_list_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = RunStore::new(tmp.path(), 3);
        let mut diag = DiagnosticLog::new();

        let rec = record(b"r1");
        store.commit(&rec, Some(&forecast()), &mut diag).unwrap();

        let runs = store.list_recent(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, rec.run_id.as_str());
        assert_eq!(runs[0].data_source_tag, "synthetic");
        assert_eq!(runs[0].mape, Some(2.0));

        let values = store.values_for(&rec.run_id).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].horizon_step, 1);
        assert_eq!(values[2].predicted_value, 12.0);
    }

    #[test]
    fn recommit_same_run_id_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let store = RunStore::new(tmp.path(), 3);
        let mut diag = DiagnosticLog::new();

        let rec = record(b"r1");
        let id1 = store.commit(&rec, Some(&forecast()), &mut diag).unwrap();
        let id2 = store.commit(&rec, Some(&forecast()), &mut diag).unwrap();
        assert_eq!(id1, id2);

        assert_eq!(store.list_recent(10).unwrap().len(), 1);
        assert_eq!(store.values_for(&rec.run_id).unwrap().len(), 3);
    }

    #[test]
    fn concurrent_commits_of_same_run_leave_one_row() {
        let tmp = TempDir::new().unwrap();
        let store = std::sync::Arc::new(RunStore::new(tmp.path(), 3));
        let rec = record(b"r1");

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let store = store.clone();
                let rec = rec.clone();
                scope.spawn(move || {
                    let mut diag = DiagnosticLog::new();
                    store.commit(&rec, Some(&forecast()), &mut diag).unwrap();
                });
            }
        });

        assert_eq!(store.list_recent(10).unwrap().len(), 1);
    }

    #[test]
    fn list_recent_orders_most_recent_first() {
        let tmp = TempDir::new().unwrap();
        let store = RunStore::new(tmp.path(), 3);
        let mut diag = DiagnosticLog::new();

        store.commit(&record(b"r1"), None, &mut diag).unwrap();
        store.commit(&record(b"r2"), None, &mut diag).unwrap();

        let runs = store.list_recent(1).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, RunId::from_bytes(b"r2").as_str());
    }

    #[test]
    fn failed_run_stores_null_metrics() {
        let tmp = TempDir::new().unwrap();
        let store = RunStore::new(tmp.path(), 3);
        let mut diag = DiagnosticLog::new();

        let mut rec = record(b"r1");
        rec.metrics = None;
        rec.status = forecastlab_core::domain::RunStatus::Failed {
            error_kind: "insufficient_history".into(),
        };
        store.commit(&rec, None, &mut diag).unwrap();

        let runs = store.list_recent(1).unwrap();
        assert_eq!(runs[0].rmse, None);
        assert_eq!(runs[0].status, "failed");
    }

    #[test]
    fn malformed_lines_are_skipped_on_read() {
        let tmp = TempDir::new().unwrap();
        let store = RunStore::new(tmp.path(), 3);
        let mut diag = DiagnosticLog::new();
        store.commit(&record(b"r1"), None, &mut diag).unwrap();

        let runs_path = tmp.path().join("forecast_runs.jsonl");
        let mut text = fs::read_to_string(&runs_path).unwrap();
        text.push_str("{not valid json\n");
        fs::write(&runs_path, text).unwrap();

        assert_eq!(store.list_recent(10).unwrap().len(), 1);
    }

    #[test]
    fn unwritable_directory_exhausts_retries() {
        let store = RunStore::new("/proc/no-such-dir/store", 1);
        let mut diag = DiagnosticLog::new();
        let err = store.commit(&record(b"r1"), None, &mut diag);
        assert!(err.is_err());
        assert!(diag
            .events()
            .iter()
            .any(|e| matches!(e, DiagEvent::StoreRetry { attempt: 1, .. })));
    }
}
