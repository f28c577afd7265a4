//! Artifact repo sink: pushes the run plot into a git repository via the
//! hosted contents API, so a static site or dashboard can pick it up.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::{NotificationPayload, Sink, SinkError};

const DEFAULT_BASE_URL: &str = "https://api.github.com";

pub struct ArtifactRepoSink {
    client: reqwest::blocking::Client,
    token: String,
    /// "owner/name"
    repo: String,
    branch: String,
    committer_name: String,
    committer_email: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ExistingContent {
    sha: String,
}

impl ArtifactRepoSink {
    pub fn new(token: impl Into<String>, repo: impl Into<String>) -> Result<Self, SinkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("forecastlab")
            .build()
            .map_err(|e| SinkError::Network(e.to_string()))?;
        Ok(Self {
            client,
            token: token.into(),
            repo: repo.into(),
            branch: "main".to_string(),
            committer_name: "forecastlab".to_string(),
            committer_email: "forecastlab@localhost".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_committer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.committer_name = name.into();
        self.committer_email = email.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.base_url, self.repo, path)
    }

    /// Sha of the file at `path` on the target branch, if it exists.
    /// Updating an existing file requires its current sha.
    fn existing_sha(&self, path: &str) -> Result<Option<String>, SinkError> {
        let response = self
            .client
            .get(self.contents_url(path))
            .bearer_auth(&self.token)
            .query(&[("ref", self.branch.as_str())])
            .send()?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let content: ExistingContent = response
            .error_for_status()?
            .json()
            .map_err(|e| SinkError::Schema(e.to_string()))?;
        Ok(Some(content.sha))
    }

    fn upload(&self, path: &str, bytes: &[u8], message: &str) -> Result<(), SinkError> {
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(bytes),
            "branch": self.branch,
            "committer": {
                "name": self.committer_name,
                "email": self.committer_email,
            },
        });
        if let Some(sha) = self.existing_sha(path)? {
            body["sha"] = json!(sha);
        }

        self.client
            .put(self.contents_url(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

impl Sink for ArtifactRepoSink {
    fn name(&self) -> &str {
        "artifact_repo"
    }

    fn send(&self, payload: &NotificationPayload) -> Result<(), SinkError> {
        let local = payload
            .report_reference
            .as_ref()
            .ok_or_else(|| SinkError::Schema("run has no report artifact".to_string()))?;
        let bytes = fs::read(PathBuf::from(local))
            .map_err(|e| SinkError::Schema(format!("cannot read artifact {local}: {e}")))?;

        let file_name = PathBuf::from(local)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| SinkError::Schema(format!("artifact path has no file name: {local}")))?;
        let remote = format!("forecasts/{}/{}", payload.run_id, file_name);
        let message = format!(
            "Add forecast plot for run {} ({} steps)",
            &payload.run_id[..payload.run_id.len().min(12)],
            payload.horizon
        );
        self.upload(&remote, &bytes, &message)
    }
}
