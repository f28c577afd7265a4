//! Hourly temperature provider backed by an OpenWeather-style API.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::{Observation, ObservationSeries, TimeRange};

use super::provider::{Provider, ProviderPayload, SourceError};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    hourly: Vec<HourlyEntry>,
}

#[derive(Debug, Deserialize)]
struct HourlyEntry {
    /// Unix timestamp (UTC seconds).
    dt: i64,
    temp: Option<f64>,
}

/// Weather provider for one coordinate pair.
pub struct OpenWeatherProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    latitude: f64,
    longitude: f64,
    units: String,
    base_url: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            latitude,
            longitude,
            units: "metric".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse(raw: &str, range: &TimeRange) -> Result<ObservationSeries, SourceError> {
        let response: WeatherResponse = serde_json::from_str(raw)
            .map_err(|e| SourceError::MalformedPayload(e.to_string()))?;

        let points: Vec<Observation> = response
            .hourly
            .iter()
            .filter_map(|entry| {
                let timestamp = chrono::DateTime::from_timestamp(entry.dt, 0)?.naive_utc();
                let value = entry.temp?;
                Some(Observation { timestamp, value })
            })
            .collect();

        if points.is_empty() {
            return Err(SourceError::EmptyPayload);
        }

        Ok(ObservationSeries::from_points("openweather", points).clipped(range))
    }
}

impl Provider for OpenWeatherProvider {
    fn name(&self) -> &str {
        "openweather"
    }

    fn fetch(&self, range: &TimeRange) -> Result<ProviderPayload, SourceError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("units", self.units.clone()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
            });
        }

        let raw = response
            .text()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        let series = Self::parse(&raw, range)?;
        Ok(ProviderPayload { series, raw })
    }
}
