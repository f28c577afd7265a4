//! Per-run diagnostic log.
//!
//! Degraded behavior never raises; it records a typed event here instead.
//! The log is threaded through the run context and attached to the final
//! `RunRecord`, so a successful run with degraded inputs is clearly
//! distinguishable from a fully-real one after the fact. There is no
//! process-wide logger in the core.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::SignalId;

/// One diagnostic event recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagEvent {
    /// A source adapter fell back to synthetic data.
    SourceDegraded { signal: SignalId, reason: String },
    /// A gap could not be forward-filled within the bounded run length.
    ImputationGap {
        signal: SignalId,
        span_start: NaiveDateTime,
        len: usize,
    },
    /// Rows dropped because required columns were still missing after
    /// imputation (documented lossy behavior).
    RowsDropped { count: usize },
    /// A notification sink failed; the remaining sinks still ran.
    SinkFailed { sink: String, reason: String },
    /// A run store write attempt failed and was retried.
    StoreRetry { attempt: u32, reason: String },
    /// Writing the raw payload to the staging area failed (non-fatal).
    StagingSkipped { signal: SignalId, reason: String },
    /// Free-form informational note.
    Info { message: String },
}

/// Append-only event log for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticLog {
    events: Vec<DiagEvent>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DiagEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = DiagEvent>) {
        self.events.extend(events);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.events.push(DiagEvent::Info {
            message: message.into(),
        });
    }

    pub fn events(&self) -> &[DiagEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Signals that were served synthetically.
    pub fn degraded_signals(&self) -> Vec<&SignalId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DiagEvent::SourceDegraded { signal, .. } => Some(signal),
                _ => None,
            })
            .collect()
    }

    /// Names of sinks that failed during dispatch.
    pub fn failed_sinks(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DiagEvent::SinkFailed { sink, .. } => Some(sink.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_signals_and_failed_sinks_are_extracted() {
        let mut log = DiagnosticLog::new();
        log.push(DiagEvent::SourceDegraded {
            signal: SignalId::from("spot_price"),
            reason: "missing credential".into(),
        });
        log.push(DiagEvent::SinkFailed {
            sink: "chat".into(),
            reason: "HTTP 401".into(),
        });
        log.info("note");

        assert_eq!(log.degraded_signals().len(), 1);
        assert_eq!(log.failed_sinks(), vec!["chat"]);
        assert_eq!(log.events().len(), 3);
    }

    #[test]
    fn log_serializes_with_tagged_events() {
        let mut log = DiagnosticLog::new();
        log.push(DiagEvent::RowsDropped { count: 3 });
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("rows_dropped"));
        let back: DiagnosticLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
