use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for one observed signal (e.g. "spot_price", "temperature").
///
/// Ordering is lexicographic; fan-in after a concurrent collection stage
/// sorts by `SignalId` so results are deterministic regardless of
/// completion order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalId(pub String);

impl SignalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SignalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique run identifier, generated once at orchestration start.
///
/// BLAKE3 hash of (start timestamp, config hash, process-random nonce),
/// rendered as hex. Stable for the lifetime of the run; the run store's
/// idempotence contract keys on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a fresh run id.
    pub fn generate(started_at: chrono::DateTime<chrono::Utc>, config_hash: &str) -> Self {
        let nonce: u64 = rand::random();
        let mut hasher = blake3::Hasher::new();
        hasher.update(started_at.to_rfc3339().as_bytes());
        hasher.update(config_hash.as_bytes());
        hasher.update(&nonce.to_le_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Build a run id from raw bytes (test fixtures, replays).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for file names and log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
