//! Dashboard gateway: HTTP front end for dashboard views.
//!
//! # Configuration
//! Settings come from defaults, an optional `dashboard.toml`, and `DASHBOARD_*`
//! environment variables. The analytics bearer token is resolved via
//! Bitwarden Secrets Manager (when `BWS_ACCESS_TOKEN` is set) or the plain
//! environment variable.
//!
//! | Env var                                 | Default                                |
//! |-----------------------------------------|----------------------------------------|
//! | `DASHBOARD_SERVER__ADDR`                | `0.0.0.0:8080`                         |
//! | `DASHBOARD_ANALYTICS__BASE_URL`         | `http://localhost:8083/management/v2`  |
//! | `DASHBOARD_ANALYTICS__FETCH_TIMEOUT_MS` | `30000`                                |
//! | `DASHBOARD_ANALYTICS_TOKEN`             | unset (anonymous)                      |

use std::sync::Arc;

use anyhow::Result;
use dashboard_gateway::{create_router, secrets::TokenResolver, settings::Settings, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dashboard_gateway=info".parse()?)
                .add_directive("dashboard_engine=info".parse()?),
        )
        .json()
        .init();

    let settings = Settings::load()?;
    let http = reqwest::Client::new();
    let token = TokenResolver::from_env(http.clone()).analytics_token().await;

    info!(
        base_url = %settings.analytics.base_url,
        fetch_timeout_ms = settings.analytics.fetch_timeout_ms,
        authenticated = token.is_some(),
        "analytics API configured"
    );

    let bind_addr = settings.server.addr.clone();
    let state = Arc::new(AppState::with_http(settings, http, token));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "dashboard gateway listening");

    axum::serve(listener, app).await?;

    Ok(())
}
