//! Pipeline configuration.
//!
//! Resolved once at process start — from a TOML file plus an environment
//! overlay for credentials — and passed by reference into the
//! orchestrator. Credential presence is data (`Option` fields), never a
//! dynamic lookup inside a stage.

use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use forecastlab_core::domain::SignalId;
use forecastlab_core::forecast::Strategy;
use forecastlab_core::sources::{ProviderKind, SignalSpec};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Optional credentials and sink identities, one typed field per secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub spot_price_api_key: Option<String>,
    pub weather_api_key: Option<String>,
    pub chat_token: Option<String>,
    pub chat_channel: Option<String>,
    pub document_token: Option<String>,
    pub document_database_id: Option<String>,
    pub artifact_repo_token: Option<String>,
    /// "owner/name" repository slug for the artifact repo sink.
    pub artifact_repo: Option<String>,
    pub artifact_repo_branch: Option<String>,
    pub committer_name: Option<String>,
    pub committer_email: Option<String>,
}

impl Credentials {
    /// Fill unset fields from the environment. File values win over env.
    pub fn overlay_env(&mut self) {
        fn var(name: &str) -> Option<String> {
            env::var(name).ok().filter(|v| !v.is_empty())
        }
        self.spot_price_api_key = self
            .spot_price_api_key
            .take()
            .or_else(|| var("SPOT_PRICE_API_KEY"));
        self.weather_api_key = self
            .weather_api_key
            .take()
            .or_else(|| var("OPENWEATHER_API_KEY"));
        self.chat_token = self.chat_token.take().or_else(|| var("CHAT_TOKEN"));
        self.chat_channel = self.chat_channel.take().or_else(|| var("CHAT_CHANNEL"));
        self.document_token = self.document_token.take().or_else(|| var("DOCUMENT_TOKEN"));
        self.document_database_id = self
            .document_database_id
            .take()
            .or_else(|| var("DOCUMENT_DATABASE_ID"));
        self.artifact_repo_token = self
            .artifact_repo_token
            .take()
            .or_else(|| var("ARTIFACT_REPO_TOKEN"));
        self.artifact_repo = self.artifact_repo.take().or_else(|| var("ARTIFACT_REPO"));
        self.artifact_repo_branch = self
            .artifact_repo_branch
            .take()
            .or_else(|| var("ARTIFACT_REPO_BRANCH"));
    }

    /// Look up one credential by the name a `SignalSpec` declares.
    pub fn by_name(&self, name: &str) -> Option<&str> {
        match name {
            "spot_price_api_key" => self.spot_price_api_key.as_deref(),
            "weather_api_key" => self.weather_api_key.as_deref(),
            _ => None,
        }
    }
}

/// Full configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Forecast horizon in grid steps (hours at the default cadence).
    pub horizon: u32,
    /// Governing cadence of the feature grid, in hours.
    pub cadence_hours: u32,
    /// Lags (in grid steps) derived for the target signal.
    pub lag_set: Vec<u32>,
    /// Season period for the seasonal-naive strategy.
    pub season_period: usize,
    pub strategy: Strategy,
    pub target_signal: SignalId,
    /// Signals to collect; the target must be among them.
    pub signals: Vec<SignalSpec>,
    /// Hours of trailing history requested from each source.
    pub history_hours: i64,
    /// Longest gap (slots) imputation may bridge.
    pub max_ffill_run: usize,
    /// Sinks that should receive the run summary.
    pub sinks_enabled: BTreeSet<String>,
    pub credentials: Credentials,
    pub staging_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub store_dir: PathBuf,
    /// Run store write attempts before giving up (persist_failed).
    pub store_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon: 24,
            cadence_hours: 1,
            lag_set: vec![1, 24],
            season_period: 24,
            strategy: Strategy::Naive,
            target_signal: SignalId::from("spot_price"),
            signals: vec![
                SignalSpec {
                    id: SignalId::from("spot_price"),
                    provider: ProviderKind::SpotPrice,
                    credential: "spot_price_api_key".to_string(),
                    units: "EUR/MWh".to_string(),
                },
                SignalSpec {
                    id: SignalId::from("temperature"),
                    provider: ProviderKind::OpenWeather,
                    credential: "weather_api_key".to_string(),
                    units: "C".to_string(),
                },
            ],
            history_hours: 168,
            max_ffill_run: 3,
            sinks_enabled: BTreeSet::new(),
            credentials: Credentials::default(),
            staging_dir: PathBuf::from("data/staging"),
            reports_dir: PathBuf::from("reports"),
            store_dir: PathBuf::from("data/store"),
            store_retries: 3,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file, then overlay credentials from env.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: PipelineConfig = toml::from_str(&text)?;
        config.validate()?;
        config.credentials.overlay_env();
        Ok(config)
    }

    /// Reject values the pipeline cannot run with. A zero horizon would
    /// score an empty forecast and a zero cadence has no grid at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::Invalid("horizon must be at least 1".into()));
        }
        if self.cadence_hours == 0 {
            return Err(ConfigError::Invalid(
                "cadence_hours must be at least 1".into(),
            ));
        }
        if self.history_hours < 1 {
            return Err(ConfigError::Invalid(
                "history_hours must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Deterministic hash of this configuration.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).expect("config serialization cannot fail");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
