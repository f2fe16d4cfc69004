//! Gateway settings.
//!
//! Layered: built-in defaults, then an optional `dashboard.toml`, then
//! `DASHBOARD_*` environment variables (`__` separates nested keys, e.g.
//! `DASHBOARD_ANALYTICS__BASE_URL`).

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSettings {
    /// Default base URL for views that do not bring their own.
    pub base_url: String,
    pub fetch_timeout_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        config::Config::builder()
            .set_default("server.addr", "0.0.0.0:8080")?
            .set_default("analytics.base_url", "http://localhost:8083/management/v2")?
            .set_default("analytics.fetch_timeout_ms", 30_000_i64)?
            .add_source(File::with_name("dashboard").required(false))
            .add_source(
                Environment::with_prefix("DASHBOARD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.analytics.fetch_timeout_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                addr: "0.0.0.0:8080".to_string(),
            },
            analytics: AnalyticsSettings {
                base_url: "http://localhost:8083/management/v2".to_string(),
                fetch_timeout_ms: 30_000,
            },
        }
    }
}
