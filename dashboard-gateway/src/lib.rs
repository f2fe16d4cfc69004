//! HTTP gateway for dashboard views.
//!
//! Each view is a running [`Dashboard`] keyed by a generated id. Clients push
//! query strings or filter selections and read back snapshots; the engine
//! fetches widget data from the analytics API in the background.

pub mod error;
pub mod handlers;
pub mod models;
pub mod secrets;
pub mod settings;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use dashboard_engine::{AnalyticsClient, Dashboard, DashboardOptions, HttpAnalyticsClient};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::ApiError;
use crate::settings::Settings;

/// Builds the analytics client for a view from its base URL.
pub type ClientFactory = Arc<dyn Fn(&str) -> Arc<dyn AnalyticsClient> + Send + Sync>;

// ------------------------------------------------------------------ //
//  Shared application state                                           //
// ------------------------------------------------------------------ //

/// Shared state injected into every Axum handler via `State`.
pub struct AppState {
    pub settings: Settings,
    pub connect: ClientFactory,
    pub views: RwLock<HashMap<Uuid, Dashboard>>,
}

impl AppState {
    pub fn new(settings: Settings, connect: ClientFactory) -> Self {
        Self {
            settings,
            connect,
            views: RwLock::new(HashMap::new()),
        }
    }

    /// State whose views talk to the analytics API over HTTP.
    pub fn with_http(settings: Settings, http: reqwest::Client, token: Option<String>) -> Self {
        let connect: ClientFactory = Arc::new(move |base_url: &str| {
            Arc::new(HttpAnalyticsClient::new(http.clone(), base_url, token.clone()))
                as Arc<dyn AnalyticsClient>
        });
        Self::new(settings, connect)
    }

    pub fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            fetch_timeout: self.settings.fetch_timeout(),
            ..Default::default()
        }
    }

    pub async fn view(&self, id: Uuid) -> Result<Dashboard, ApiError> {
        self.views
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ApiError::NotFound(id))
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // View lifecycle
        .route("/views", post(handlers::create_view))
        .route(
            "/views/:id",
            get(handlers::get_view).delete(handlers::delete_view),
        )
        // Navigation: JSON body or raw query string
        .route("/views/:id/query", put(handlers::navigate_view))
        .route("/views/:id/navigate", post(handlers::navigate_query_string))
        .route("/views/:id/filters", post(handlers::select_filters))
        .route("/views/:id/refresh", post(handlers::refresh_view))
        .route("/views/:id/widgets", put(handlers::replace_widgets))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
