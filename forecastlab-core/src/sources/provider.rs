//! Provider trait and structured source error types.
//!
//! A `Provider` fetches one signal's observations from one external API.
//! Providers return typed errors; the `SourceAdapter` above them converts
//! every failure into a synthetic fallback, so these errors never escape
//! the collection stage.

use thiserror::Error;

use crate::domain::{ObservationSeries, TimeRange};

/// Internal errors for one provider call.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("credential not configured")]
    MissingCredential,

    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned HTTP {status}")]
    Http { status: u16 },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("provider returned no usable observations")]
    EmptyPayload,
}

/// Raw payload plus the parsed series for one fetch.
///
/// The raw body is kept so the adapter can write it to the staging area
/// for reproducibility.
#[derive(Debug, Clone)]
pub struct ProviderPayload {
    pub series: ObservationSeries,
    pub raw: String,
}

/// One typed observation source (spot price API, weather API, ...).
pub trait Provider: Send + Sync {
    /// Stable name used as the series source tag.
    fn name(&self) -> &str;

    /// Fetch observations covering the inclusive time range.
    fn fetch(&self, range: &TimeRange) -> Result<ProviderPayload, SourceError>;
}
