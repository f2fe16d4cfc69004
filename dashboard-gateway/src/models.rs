//! Request / response bodies for the gateway's HTTP API.

use dashboard_engine::{DashboardSnapshot, QueryParams, Widget};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ------------------------------------------------------------------ //
//  POST /views                                                        //
// ------------------------------------------------------------------ //

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateViewRequest {
    /// Analytics API base URL; the configured default when absent.
    pub base_url: Option<String>,
    /// Filter-bar definitions, passed through to snapshots untouched.
    #[serde(default)]
    pub filters: Vec<Value>,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    /// Initial query string; an empty map selects the default period.
    #[serde(default)]
    pub query_params: QueryParams,
}

#[derive(Debug, Serialize)]
pub struct CreateViewResponse {
    pub id: Uuid,
    pub snapshot: DashboardSnapshot,
}

// ------------------------------------------------------------------ //
//  POST /views/:id/filters                                            //
// ------------------------------------------------------------------ //

/// Query parameters the client should push to its URL, plus the loading
/// snapshot they produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersResponse {
    pub query_params: QueryParams,
    pub snapshot: DashboardSnapshot,
}
