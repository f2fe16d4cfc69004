//! Analytics request bodies posted by dashboard widgets.

use serde::{Deserialize, Serialize};

use crate::time_frame::TimeRange;

// ------------------------------------------------------------------ //
//  Filters                                                            //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterOperator {
    In,
}

/// Server-side filter clause: one per distinct filter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub name: String,
    pub operator: FilterOperator,
    pub value: Vec<String>,
}

impl RequestFilter {
    pub fn any_of(name: impl Into<String>, value: Vec<String>) -> Self {
        Self {
            name: name.into(),
            operator: FilterOperator::In,
            value,
        }
    }
}

// ------------------------------------------------------------------ //
//  Metrics                                                            //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSort {
    pub measure: String,
    pub order: String,
}

/// A metric to compute and the measures wanted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRequest {
    pub name: String,
    #[serde(default)]
    pub measures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorts: Option<Vec<MetricSort>>,
}

// ------------------------------------------------------------------ //
//  Requests                                                           //
// ------------------------------------------------------------------ //

/// Body of `POST /analytics/measures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuresRequest {
    pub time_range: TimeRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<RequestFilter>>,
    #[serde(default)]
    pub metrics: Vec<MetricRequest>,
}

/// Body of `POST /analytics/facets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetsRequest {
    pub time_range: TimeRange,
    pub by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<RequestFilter>>,
    #[serde(default)]
    pub metrics: Vec<MetricRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Body of `POST /analytics/time-series`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesRequest {
    pub time_range: TimeRange,
    /// Bucket width in milliseconds.
    pub interval: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<RequestFilter>>,
    #[serde(default)]
    pub metrics: Vec<MetricRequest>,
}

/// A widget's data request, tagged on `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WidgetRequest {
    #[serde(rename = "measures")]
    Measures(MeasuresRequest),
    #[serde(rename = "facets")]
    Facets(FacetsRequest),
    #[serde(rename = "time-series")]
    TimeSeries(TimeSeriesRequest),
}

impl WidgetRequest {
    /// Path of the analytics endpoint serving this request, relative to the
    /// base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            WidgetRequest::Measures(_) => "/analytics/measures",
            WidgetRequest::Facets(_) => "/analytics/facets",
            WidgetRequest::TimeSeries(_) => "/analytics/time-series",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WidgetRequest::Measures(_) => "measures",
            WidgetRequest::Facets(_) => "facets",
            WidgetRequest::TimeSeries(_) => "time-series",
        }
    }

    pub fn time_range(&self) -> &TimeRange {
        match self {
            WidgetRequest::Measures(r) => &r.time_range,
            WidgetRequest::Facets(r) => &r.time_range,
            WidgetRequest::TimeSeries(r) => &r.time_range,
        }
    }

    pub fn filters(&self) -> Option<&[RequestFilter]> {
        match self {
            WidgetRequest::Measures(r) => r.filters.as_deref(),
            WidgetRequest::Facets(r) => r.filters.as_deref(),
            WidgetRequest::TimeSeries(r) => r.filters.as_deref(),
        }
    }
}
