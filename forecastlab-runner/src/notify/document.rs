//! Document sink: appends a row to a document database (Notion-style API).

use std::time::Duration;

use serde_json::json;

use super::{NotificationPayload, Sink, SinkError};

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const API_VERSION: &str = "2022-06-28";

/// Property names in the target database.
///
/// Databases are user-managed, so the column names the sink writes to are
/// configurable; the defaults match the reference workspace layout.
#[derive(Debug, Clone)]
pub struct PropertyNames {
    pub title: String,
    pub horizon: String,
    pub rmse: String,
    pub mae: String,
    pub mape: String,
    pub data_source: String,
    pub report: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            title: "Run".to_string(),
            horizon: "Horizon".to_string(),
            rmse: "RMSE".to_string(),
            mae: "MAE".to_string(),
            mape: "MAPE".to_string(),
            data_source: "Data Source".to_string(),
            report: "Report".to_string(),
        }
    }
}

pub struct DocumentSink {
    client: reqwest::blocking::Client,
    token: String,
    database_id: String,
    properties: PropertyNames,
    base_url: String,
}

impl DocumentSink {
    pub fn new(
        token: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Result<Self, SinkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SinkError::Network(e.to_string()))?;
        Ok(Self {
            client,
            token: token.into(),
            database_id: database_id.into(),
            properties: PropertyNames::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_properties(mut self, properties: PropertyNames) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn page_body(&self, payload: &NotificationPayload) -> serde_json::Value {
        let p = &self.properties;
        let short_id = &payload.run_id[..payload.run_id.len().min(12)];

        let mut properties = serde_json::Map::new();
        properties.insert(
            p.title.clone(),
            json!({ "title": [{ "text": { "content": format!("Run {short_id}") } }] }),
        );
        properties.insert(p.horizon.clone(), json!({ "number": payload.horizon }));
        properties.insert(
            p.data_source.clone(),
            json!({ "select": { "name": payload.data_source } }),
        );
        if let Some(m) = payload.metrics {
            properties.insert(p.rmse.clone(), json!({ "number": m.rmse }));
            properties.insert(p.mae.clone(), json!({ "number": m.mae }));
            // Undefined MAPE stays absent rather than rendering as zero.
            if let Some(mape) = m.mape.value() {
                properties.insert(p.mape.clone(), json!({ "number": mape }));
            }
        }
        if let Some(report) = &payload.report_reference {
            properties.insert(
                p.report.clone(),
                json!({ "rich_text": [{ "text": { "content": report } }] }),
            );
        }

        json!({
            "parent": { "database_id": self.database_id },
            "properties": properties,
        })
    }
}

impl Sink for DocumentSink {
    fn name(&self) -> &str {
        "document"
    }

    fn send(&self, payload: &NotificationPayload) -> Result<(), SinkError> {
        self.client
            .post(format!("{}/pages", self.base_url))
            .bearer_auth(&self.token)
            .header("Notion-Version", API_VERSION)
            .json(&self.page_body(payload))
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forecastlab_core::score::{Mape, Metrics};

    fn payload(mape: Mape) -> NotificationPayload {
        NotificationPayload {
            run_id: "abcdef0123456789".into(),
            timestamp: Utc::now(),
            horizon: 24,
            metrics: Some(Metrics {
                rmse: 1.5,
                mae: 1.0,
                mape,
            }),
            data_source: "real".into(),
            report_reference: None,
        }
    }

    #[test]
    fn page_body_maps_metrics_to_configured_properties() {
        let sink = DocumentSink::new("t", "db").unwrap().with_properties(PropertyNames {
            rmse: "Root Mean Square Error".to_string(),
            ..PropertyNames::default()
        });
        let body = sink.page_body(&payload(Mape::Defined(4.0)));
        let props = &body["properties"];
        assert_eq!(props["Root Mean Square Error"]["number"], 1.5);
        assert_eq!(props["MAPE"]["number"], 4.0);
        assert_eq!(props["Data Source"]["select"]["name"], "real");
        assert_eq!(body["parent"]["database_id"], "db");
    }

    #[test]
    fn undefined_mape_is_omitted_from_the_page() {
        let sink = DocumentSink::new("t", "db").unwrap();
        let body = sink.page_body(&payload(Mape::Undefined));
        assert!(body["properties"].get("MAPE").is_none());
        assert_eq!(body["properties"]["MAE"]["number"], 1.0);
    }
}
