//! Pipeline runner: configuration, orchestration, persistence, artifact
//! export, and notification fan-out on top of `forecastlab-core`.

pub mod config;
pub mod notify;
pub mod orchestrator;
pub mod reporting;
pub mod store;

pub use config::{ConfigError, Credentials, PipelineConfig};
pub use orchestrator::{CancelToken, Orchestrator, PipelineState, SetupError};
pub use reporting::{ArtifactPaths, ArtifactWriter};
pub use store::{RunStore, StoreError, StoredRun, StoredValue};
