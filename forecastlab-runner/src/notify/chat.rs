//! Chat sink: posts a short run summary to a chat channel.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::{NotificationPayload, Sink, SinkError};

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

pub struct ChatSink {
    client: reqwest::blocking::Client,
    token: String,
    channel: String,
    base_url: String,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

impl ChatSink {
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Result<Self, SinkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SinkError::Network(e.to_string()))?;
        Ok(Self {
            client,
            token: token.into(),
            channel: channel.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the sink at a different endpoint (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn message_text(payload: &NotificationPayload) -> String {
        let mut lines = vec![
            format!("Forecast run `{}`", payload.run_id),
            format!(
                "{} | horizon {}h | data: {}",
                payload.timestamp.format("%Y-%m-%d %H:%M UTC"),
                payload.horizon,
                payload.data_source
            ),
        ];
        match payload.metrics {
            Some(m) => lines.push(format!(
                "RMSE {:.2} | MAE {:.2} | MAPE {}",
                m.rmse,
                m.mae,
                payload.mape_display()
            )),
            None => lines.push("no metrics (run failed before scoring)".to_string()),
        }
        if let Some(report) = &payload.report_reference {
            lines.push(format!("report: {report}"));
        }
        lines.join("\n")
    }
}

impl Sink for ChatSink {
    fn name(&self) -> &str {
        "chat"
    }

    fn send(&self, payload: &NotificationPayload) -> Result<(), SinkError> {
        let body = json!({
            "channel": self.channel,
            "text": Self::message_text(payload),
        });

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()?
            .error_for_status()?;

        // The chat API reports auth and channel errors in the body with
        // HTTP 200, so a status check alone is not enough.
        let parsed: PostMessageResponse = response
            .json()
            .map_err(|e| SinkError::Schema(e.to_string()))?;
        if !parsed.ok {
            let reason = parsed.error.unwrap_or_else(|| "unknown".to_string());
            return match reason.as_str() {
                "invalid_auth" | "not_authed" | "token_revoked" => Err(SinkError::Auth),
                _ => Err(SinkError::Schema(reason)),
            };
        }
        Ok(())
    }
}
