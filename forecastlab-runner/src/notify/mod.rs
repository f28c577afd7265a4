//! Notification fan-out.
//!
//! Every enabled sink receives the same `NotificationPayload`, built once
//! from the finished run record. Sinks fail independently: one sink's
//! auth or network error never blocks the others and never fails the run.

mod artifact_repo;
mod chat;
mod document;

pub use artifact_repo::ArtifactRepoSink;
pub use chat::ChatSink;
pub use document::{DocumentSink, PropertyNames};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use forecastlab_core::domain::RunRecord;
use forecastlab_core::score::Metrics;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("missing or rejected credential")]
    Auth,
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },
    #[error("response did not match the expected schema: {0}")]
    Schema(String),
}

impl From<reqwest::Error> for SinkError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => SinkError::Auth,
            Some(status) => SinkError::Http {
                status: status.as_u16(),
            },
            None => SinkError::Network(e.to_string()),
        }
    }
}

/// The stable field set every sink renders from.
///
/// Field names here are a contract with downstream consumers; adding is
/// fine, renaming or removing is not.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub horizon: u32,
    pub metrics: Option<Metrics>,
    pub data_source: String,
    pub report_reference: Option<String>,
}

impl NotificationPayload {
    pub fn from_record(record: &RunRecord) -> Self {
        Self {
            run_id: record.run_id.to_string(),
            timestamp: record.timestamp,
            horizon: record.horizon,
            metrics: record.metrics,
            data_source: record.data_source_tag().to_string(),
            report_reference: record.report_reference.clone(),
        }
    }

    /// "12.34" or "n/a" — undefined MAPE must never render as a number.
    pub fn mape_display(&self) -> String {
        self.metrics
            .and_then(|m| m.mape.value())
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "n/a".to_string())
    }
}

/// One notification target. Implementations must be cheap to construct
/// and safe to call from a rayon worker.
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;
    fn send(&self, payload: &NotificationPayload) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkOutcome {
    Sent { sink: String },
    Failed { sink: String, reason: String },
}

impl SinkOutcome {
    pub fn sink(&self) -> &str {
        match self {
            SinkOutcome::Sent { sink } | SinkOutcome::Failed { sink, .. } => sink,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, SinkOutcome::Sent { .. })
    }
}

/// Deliver the payload to every sink in parallel.
///
/// Outcomes come back sorted by sink name so downstream reporting is
/// deterministic regardless of worker scheduling.
pub fn dispatch(payload: &NotificationPayload, sinks: &[Box<dyn Sink>]) -> Vec<SinkOutcome> {
    let mut outcomes: Vec<SinkOutcome> = sinks
        .par_iter()
        .map(|sink| match sink.send(payload) {
            Ok(()) => SinkOutcome::Sent {
                sink: sink.name().to_string(),
            },
            Err(e) => SinkOutcome::Failed {
                sink: sink.name().to_string(),
                reason: e.to_string(),
            },
        })
        .collect();
    outcomes.sort_by(|a, b| a.sink().cmp(b.sink()));
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecastlab_core::domain::{RunId, RunRecord};
    use forecastlab_core::score::Mape;

    struct FixedSink {
        name: &'static str,
        fail: bool,
    }

    impl Sink for FixedSink {
        fn name(&self) -> &str {
            self.name
        }

        fn send(&self, _payload: &NotificationPayload) -> Result<(), SinkError> {
            if self.fail {
                Err(SinkError::Network("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    fn payload() -> NotificationPayload {
        let record = RunRecord::started(RunId::from_bytes(b"r"), Utc::now(), 24, "naive");
        NotificationPayload::from_record(&record)
    }

    #[test]
    fn dispatch_collects_all_outcomes_sorted_by_name() {
        let sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(FixedSink { name: "document", fail: true }),
            Box::new(FixedSink { name: "chat", fail: false }),
        ];
        let outcomes = dispatch(&payload(), &sinks);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].sink(), "chat");
        assert!(outcomes[0].is_sent());
        assert_eq!(outcomes[1].sink(), "document");
        assert!(!outcomes[1].is_sent());
    }

    #[test]
    fn one_failing_sink_does_not_stop_the_rest() {
        let sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(FixedSink { name: "a", fail: true }),
            Box::new(FixedSink { name: "b", fail: false }),
            Box::new(FixedSink { name: "c", fail: false }),
        ];
        let outcomes = dispatch(&payload(), &sinks);
        assert_eq!(outcomes.iter().filter(|o| o.is_sent()).count(), 2);
    }

    #[test]
    fn undefined_mape_renders_as_na() {
        let mut p = payload();
        p.metrics = Some(Metrics {
            rmse: 1.0,
            mae: 1.0,
            mape: Mape::Undefined,
        });
        assert_eq!(p.mape_display(), "n/a");

        p.metrics = Some(Metrics {
            rmse: 1.0,
            mae: 1.0,
            mape: Mape::Defined(12.345),
        });
        assert_eq!(p.mape_display(), "12.35");
    }
}
