//! Hourly electricity spot price provider.
//!
//! Fetches day-ahead spot prices from a Nord Pool-style market data API.
//! Rows with unparseable timestamps or values are skipped, matching how
//! exchange feeds intermittently emit placeholder rows.

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::domain::{Observation, ObservationSeries, TimeRange};

use super::provider::{Provider, ProviderPayload, SourceError};

const DEFAULT_BASE_URL: &str = "https://api.nordpoolgroup.com/marketdata/page/10";

/// Market-data response shape: a list of (timestamp, price) rows.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    data: Vec<PriceRow>,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(rename = "DateTime")]
    datetime: String,
    #[serde(rename = "SpotPrice")]
    spot_price: Option<f64>,
}

/// Spot price provider for one bidding area.
pub struct SpotPriceProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    area: String,
    currency: String,
    base_url: String,
}

impl SpotPriceProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            area: "DK1".to_string(),
            currency: "EUR".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_area(mut self, area: impl Into<String>, currency: impl Into<String>) -> Self {
        self.area = area.into();
        self.currency = currency.into();
        self
    }

    /// Point the provider at a different endpoint (tests, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse(raw: &str, range: &TimeRange) -> Result<ObservationSeries, SourceError> {
        let response: PriceResponse = serde_json::from_str(raw)
            .map_err(|e| SourceError::MalformedPayload(e.to_string()))?;

        let points: Vec<Observation> = response
            .data
            .iter()
            .filter_map(|row| {
                let timestamp =
                    NaiveDateTime::parse_from_str(&row.datetime, "%Y-%m-%dT%H:%M:%S").ok()?;
                let value = row.spot_price?;
                Some(Observation { timestamp, value })
            })
            .collect();

        if points.is_empty() {
            return Err(SourceError::EmptyPayload);
        }

        Ok(ObservationSeries::from_points("spot_price_api", points).clipped(range))
    }
}

impl Provider for SpotPriceProvider {
    fn name(&self) -> &str {
        "spot_price_api"
    }

    fn fetch(&self, range: &TimeRange) -> Result<ProviderPayload, SourceError> {
        let response = self
            .client
            .get(&self.base_url)
            .bearer_auth(&self.api_key)
            .query(&[
                ("startDate", range.start.format("%Y-%m-%d").to_string()),
                ("endDate", range.end.format("%Y-%m-%d").to_string()),
                ("area", self.area.clone()),
                ("currency", self.currency.clone()),
                ("resolution", "hour".to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> TimeRange {
        let end = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        TimeRange::trailing_hours(end, 24)
    }

    #[test]
    fn parses_rows_and_skips_malformed_ones() {
        let raw = r#"{"data":[
            {"DateTime":"2024-03-01T10:00:00","SpotPrice":61.5},
            {"DateTime":"not-a-date","SpotPrice":10.0},
            {"DateTime":"2024-03-01T11:00:00","SpotPrice":null},
            {"DateTime":"2024-03-01T12:00:00","SpotPrice":59.0}
        ]}"#;
        let series = SpotPriceProvider::parse(raw, &range()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.values(), vec![61.5, 59.0]);
    }

    #[test]
    fn all_rows_malformed_is_empty_payload() {
        let raw = r#"{"data":[{"DateTime":"garbage","SpotPrice":1.0}]}"#;
        assert!(matches!(
            SpotPriceProvider::parse(raw, &range()),
            Err(SourceError::EmptyPayload)
        ));
    }

    #[test]
    fn non_json_body_is_malformed_payload() {
        assert!(matches!(
            SpotPriceProvider::parse("<html>503</html>", &range()),
            Err(SourceError::MalformedPayload(_))
        ));
    }

    #[test]
    fn rows_outside_the_range_are_clipped() {
        let raw = r#"{"data":[
            {"DateTime":"2024-02-01T10:00:00","SpotPrice":40.0},
            {"DateTime":"2024-03-01T10:00:00","SpotPrice":61.5}
        ]}"#;
        let series = SpotPriceProvider::parse(raw, &range()).unwrap();
        assert_eq!(series.values(), vec![61.5]);
    }
}
