//! Analytics API token lookup.
//!
//! When `BWS_ACCESS_TOKEN` is set the token is read from Bitwarden Secrets
//! Manager (secret id from `BWS_ANALYTICS_TOKEN_ID`). If that is not
//! configured or the lookup fails, `DASHBOARD_ANALYTICS_TOKEN` is used.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

/// Env var holding the analytics bearer token when Bitwarden is not used.
pub const ANALYTICS_TOKEN_ENV: &str = "DASHBOARD_ANALYTICS_TOKEN";

const DEFAULT_SECRET_ID: &str = "dashboard-analytics-token";
const DEFAULT_BWS_API_URL: &str = "https://api.bitwarden.com";

#[derive(Deserialize)]
struct BwsSecret {
    value: String,
}

/// Resolves the bearer token the gateway presents to the analytics API.
pub struct TokenResolver {
    http: reqwest::Client,
    /// BWS machine-account access token.
    access_token: Option<String>,
    api_url: String,
    secret_id: String,
    env_fallback: String,
}

impl TokenResolver {
    pub fn from_env(http: reqwest::Client) -> Self {
        Self {
            http,
            access_token: std::env::var("BWS_ACCESS_TOKEN").ok(),
            api_url: std::env::var("BWS_API_URL")
                .unwrap_or_else(|_| DEFAULT_BWS_API_URL.to_string()),
            secret_id: std::env::var("BWS_ANALYTICS_TOKEN_ID")
                .unwrap_or_else(|_| DEFAULT_SECRET_ID.to_string()),
            env_fallback: ANALYTICS_TOKEN_ENV.to_string(),
        }
    }

    /// Bearer token for the analytics API, or `None` to call it anonymously.
    pub async fn analytics_token(&self) -> Option<String> {
        if let Some(access_token) = &self.access_token {
            match self.bitwarden_token(access_token).await {
                Ok(token) => return Some(token),
                Err(e) => warn!(
                    secret_id = %self.secret_id,
                    error = %e,
                    "Bitwarden lookup failed, trying {}",
                    self.env_fallback
                ),
            }
        }

        let token = std::env::var(&self.env_fallback)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            info!("no analytics token configured, calling API anonymously");
        }
        token
    }

    async fn bitwarden_token(&self, access_token: &str) -> Result<String> {
        let url = format!("{}/secrets/{}", self.api_url.trim_end_matches('/'), self.secret_id);
        let secret: BwsSecret = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .context("Bitwarden request failed")?
            .error_for_status()
            .context("Bitwarden rejected the lookup")?
            .json()
            .await
            .context("malformed Bitwarden secret")?;
        Ok(secret.value)
    }
}
