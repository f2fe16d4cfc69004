//! Error types.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single widget fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to decode analytics response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("dashboard engine has stopped")]
    Stopped,
}
