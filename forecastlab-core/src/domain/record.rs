//! Run record: the one durable artifact of a pipeline execution.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::score::Metrics;

use super::{DiagnosticLog, Provenance, RunId, SignalId};

/// Current schema version for persisted records.
pub const SCHEMA_VERSION: u32 = 1;

/// Whether the computation side of the run succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed { error_kind: String },
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

/// Whether the run record reached the run store.
///
/// Tracked independently of `RunStatus`: a run whose computation succeeded
/// but whose commit exhausted its retries is `Success` + `PersistFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistStatus {
    Pending,
    Committed,
    PersistFailed,
}

/// Complete record of one pipeline run.
///
/// Created at orchestration start, filled incrementally as stages complete,
/// and immutable once the run store has committed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub timestamp: DateTime<Utc>,
    pub horizon: u32,
    pub strategy: String,
    /// Provenance per collected signal (real vs synthetic fallback).
    pub data_sources: BTreeMap<SignalId, Provenance>,
    /// None while the run is in flight or when it failed before scoring.
    pub metrics: Option<Metrics>,
    pub status: RunStatus,
    pub persistence: PersistStatus,
    /// Path of the rendered plot for this run, if artifacts were written.
    pub report_reference: Option<String>,
    pub diagnostics: DiagnosticLog,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunRecord {
    /// Fresh record at orchestration start; stages fill the rest in.
    pub fn started(run_id: RunId, timestamp: DateTime<Utc>, horizon: u32, strategy: &str) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id,
            timestamp,
            horizon,
            strategy: strategy.to_string(),
            data_sources: BTreeMap::new(),
            metrics: None,
            status: RunStatus::Success,
            persistence: PersistStatus::Pending,
            report_reference: None,
            diagnostics: DiagnosticLog::new(),
        }
    }

    /// Collapse the per-signal provenance map into a single stored tag.
    pub fn data_source_tag(&self) -> &'static str {
        let total = self.data_sources.len();
        let synthetic = self
            .data_sources
            .values()
            .filter(|p| **p == Provenance::Synthetic)
            .count();
        match synthetic {
            0 => "real",
            n if n == total => "synthetic",
            _ => "mixed",
        }
    }

    /// True when every input signal came from a real provider.
    pub fn fully_real(&self) -> bool {
        self.data_sources.values().all(|p| *p == Provenance::Real)
    }
}
