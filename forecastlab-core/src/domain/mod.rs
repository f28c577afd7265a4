//! Domain types shared across the pipeline.

mod diag;
mod ids;
mod record;
mod series;

pub use diag::{DiagEvent, DiagnosticLog};
pub use ids::{RunId, SignalId};
pub use record::{PersistStatus, RunRecord, RunStatus, SCHEMA_VERSION};
pub use series::{Observation, ObservationSeries, Provenance, TimeRange};
