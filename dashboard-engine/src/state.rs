//! Dashboard state machine.
//!
//! Pure transitions over the dashboard view: navigation, widget replacement
//! and refresh each start a new generation and return the fetches it needs;
//! [`DashboardState::apply`] merges a completed fetch only if it belongs to
//! the current generation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::builder::build_requests;
use crate::error::FetchError;
use crate::filter::{self, PeriodSelection, SelectedFilter};
use crate::query::QueryParams;
use crate::request::WidgetRequest;
use crate::response::WidgetResponse;
use crate::time_frame::{resolve_time_range, ResolvedTimeRange};
use crate::widget::Widget;

/// One fetch to perform for one widget slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTask {
    pub generation: u64,
    pub index: usize,
    pub widget_id: String,
    pub request: WidgetRequest,
}

/// Result of a [`FetchTask`].
#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub index: usize,
    pub widget_id: String,
    pub result: Result<WidgetResponse, FetchError>,
}

/// Observable view of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub generation: u64,
    pub query_params: QueryParams,
    pub selected_filters: Vec<SelectedFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedTimeRange>,
    /// Filter-bar configuration, passed through untouched.
    pub filters: Vec<serde_json::Value>,
    pub widgets: Vec<Widget>,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    query_params: QueryParams,
    selected_filters: Vec<SelectedFilter>,
    resolved: Option<ResolvedTimeRange>,
    filters: Vec<serde_json::Value>,
    widget_configs: Vec<Widget>,
    widgets: Vec<Widget>,
    generation: u64,
}

impl DashboardState {
    pub fn new(filters: Vec<serde_json::Value>, widget_configs: Vec<Widget>) -> Self {
        Self {
            query_params: QueryParams::new(),
            selected_filters: Vec::new(),
            resolved: None,
            filters,
            widgets: widget_configs.clone(),
            widget_configs,
            generation: 0,
        }
    }

    // ------------------------------------------------------------------ //
    //  Transitions                                                        //
    // ------------------------------------------------------------------ //

    /// A navigation event: the query string changed.
    pub fn navigate(&mut self, params: QueryParams, now: DateTime<Utc>) -> Vec<FetchTask> {
        self.selected_filters = filter::decode(&params);
        self.query_params = params;
        self.rebuild(now)
    }

    /// New widget configuration under the current filters.
    pub fn replace_widgets(
        &mut self,
        widget_configs: Vec<Widget>,
        now: DateTime<Utc>,
    ) -> Vec<FetchTask> {
        self.widget_configs = widget_configs;
        self.rebuild(now)
    }

    /// Re-fetch the current requests without rebuilding them.
    pub fn refresh(&mut self) -> Vec<FetchTask> {
        for widget in self.widgets.iter_mut().filter(|w| w.request.is_some()) {
            widget.invalidate();
        }
        self.begin_generation()
    }

    /// Merge a completed fetch. Returns `false` when the outcome is stale.
    pub fn apply(&mut self, outcome: FetchOutcome) -> bool {
        if outcome.generation != self.generation {
            return false;
        }
        let Some(widget) = self.widgets.get_mut(outcome.index) else {
            return false;
        };
        if widget.id != outcome.widget_id || widget.request.is_none() {
            return false;
        }

        match outcome.result {
            Ok(response) => {
                widget.response = Some(response);
                widget.error = None;
            }
            Err(e) => {
                widget.response = None;
                widget.error = Some(e.to_string());
            }
        }
        true
    }

    fn rebuild(&mut self, now: DateTime<Utc>) -> Vec<FetchTask> {
        let selection = PeriodSelection::from_filters(&self.selected_filters);
        let resolved = resolve_time_range(
            selection.period.as_deref(),
            selection.from.as_deref(),
            selection.to.as_deref(),
            now,
        );
        let request_filters = filter::to_request_filters(&self.selected_filters);

        self.widgets = build_requests(&self.widget_configs, &resolved, &request_filters);
        self.resolved = Some(resolved);
        self.begin_generation()
    }

    fn begin_generation(&mut self) -> Vec<FetchTask> {
        self.generation += 1;
        let generation = self.generation;
        self.widgets
            .iter()
            .enumerate()
            .filter_map(|(index, widget)| {
                widget.request.clone().map(|request| FetchTask {
                    generation,
                    index,
                    widget_id: widget.id.clone(),
                    request,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------ //
    //  Accessors                                                          //
    // ------------------------------------------------------------------ //

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn resolved(&self) -> Option<&ResolvedTimeRange> {
        self.resolved.as_ref()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            generation: self.generation,
            query_params: self.query_params.clone(),
            selected_filters: self.selected_filters.clone(),
            resolved: self.resolved.clone(),
            filters: self.filters.clone(),
            widgets: self.widgets.clone(),
        }
    }
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //
