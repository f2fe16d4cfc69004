//! Axum HTTP handlers for the dashboard gateway.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use dashboard_engine::{Dashboard, DashboardSnapshot, QueryParams, SelectedFilter, Widget};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{CreateViewRequest, CreateViewResponse, FiltersResponse},
    AppState,
};

// ------------------------------------------------------------------ //
//  GET /health                                                        //
// ------------------------------------------------------------------ //

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ------------------------------------------------------------------ //
//  POST /views                                                        //
// ------------------------------------------------------------------ //

/// Start a view and navigate it to the initial query parameters.
pub async fn create_view(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateViewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let base_url = req
        .base_url
        .unwrap_or_else(|| state.settings.analytics.base_url.clone());
    let client = (state.connect)(&base_url);

    let dashboard = Dashboard::spawn(client, req.filters, req.widgets, state.dashboard_options());
    let snapshot = dashboard.navigate(req.query_params).await?;

    let id = Uuid::new_v4();
    state.views.write().await.insert(id, dashboard);
    info!(view = %id, base_url = %base_url, widgets = snapshot.widgets.len(), "view created");

    Ok((StatusCode::CREATED, Json(CreateViewResponse { id, snapshot })))
}

// ------------------------------------------------------------------ //
//  GET / DELETE /views/:id                                            //
// ------------------------------------------------------------------ //

pub async fn get_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    Ok(Json(state.view(id).await?.snapshot()))
}

/// Dropping the stored handle stops the view's engine task.
pub async fn delete_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .views
        .write()
        .await
        .remove(&id)
        .ok_or(ApiError::NotFound(id))?;
    info!(view = %id, "view deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ------------------------------------------------------------------ //
//  Navigation                                                         //
// ------------------------------------------------------------------ //

/// `PUT /views/:id/query` with the query parameters as a JSON object.
pub async fn navigate_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(params): Json<QueryParams>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let snapshot = state.view(id).await?.navigate(params).await?;
    Ok(Json(snapshot))
}

/// `POST /views/:id/navigate?period=1d&API=a,b` with the browser query
/// string forwarded as-is. Repeated keys collect into a list.
pub async fn navigate_query_string(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let params = QueryParams::from_pairs(pairs);
    let snapshot = state.view(id).await?.navigate(params).await?;
    Ok(Json(snapshot))
}

/// `POST /views/:id/filters` with the filter bar's current selection.
pub async fn select_filters(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(filters): Json<Vec<SelectedFilter>>,
) -> Result<Json<FiltersResponse>, ApiError> {
    let navigation = state.view(id).await?.select_filters(filters).await?;
    info!(view = %id, generation = navigation.snapshot.generation, "filters selected");
    Ok(Json(FiltersResponse {
        query_params: navigation.query_params,
        snapshot: navigation.snapshot,
    }))
}

// ------------------------------------------------------------------ //
//  Refresh / widgets                                                  //
// ------------------------------------------------------------------ //

pub async fn refresh_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    Ok(Json(state.view(id).await?.refresh().await?))
}

pub async fn replace_widgets(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(widgets): Json<Vec<Widget>>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    Ok(Json(state.view(id).await?.replace_widgets(widgets).await?))
}
