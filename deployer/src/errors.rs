//! Error types for fwfleet

use std::time::Duration;

use thiserror::Error;

use crate::models::outcome::UpdateStage;

/// Process-level error type
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Revision marker corrupt: {0}")]
    MarkerCorrupt(String),
}

/// Failure of a single attempt against a device
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Device rejected upload: {status} - {body}")]
    DeviceRejected { status: u16, body: String },

    #[error("Device did not come back online: {0}")]
    SettleTimeout(String),

    #[error("Device update budget of {0:?} exhausted")]
    DeadlineExceeded(Duration),
}

impl UpdateError {
    /// Map a reqwest error onto the retryable network kind
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_request() {
            "request"
        } else {
            "transport"
        };
        UpdateError::TransientNetwork(format!("{}: {}", kind, err))
    }
}

/// A stage gave up: retries or the device budget ran out
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} failed after {attempts} attempt(s): {last_error}")]
pub struct StageFailed {
    pub stage: UpdateStage,
    pub attempts: u32,
    pub last_error: UpdateError,
}
