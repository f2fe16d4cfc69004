//! Analytics response payloads attached to widgets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub value: f64,
}

// ------------------------------------------------------------------ //
//  Measures                                                           //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMeasures {
    pub name: String,
    pub measures: Vec<Measure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuresResponse {
    pub metrics: Vec<MetricMeasures>,
}

// ------------------------------------------------------------------ //
//  Facets                                                             //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub measures: Vec<Measure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFacets {
    pub name: String,
    pub buckets: Vec<FacetBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetsResponse {
    pub metrics: Vec<MetricFacets>,
}

// ------------------------------------------------------------------ //
//  Time series                                                        //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesBucket {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Bucket start, epoch milliseconds.
    pub timestamp: i64,
    pub measures: Vec<Measure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTimeSeries {
    pub name: String,
    pub buckets: Vec<TimeSeriesBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesResponse {
    pub metrics: Vec<MetricTimeSeries>,
}

// ------------------------------------------------------------------ //
//  WidgetResponse                                                     //
// ------------------------------------------------------------------ //

/// Payload attached to a widget once its fetch completes.
///
/// Serialized without a tag so the JSON matches what the analytics API
/// returned. The fetch path decodes by request type; the untagged
/// deserializer only serves widget configs that ship a cached response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetResponse {
    Measures(MeasuresResponse),
    TimeSeries(TimeSeriesResponse),
    Facets(FacetsResponse),
}

impl From<MeasuresResponse> for WidgetResponse {
    fn from(r: MeasuresResponse) -> Self {
        WidgetResponse::Measures(r)
    }
}

impl From<FacetsResponse> for WidgetResponse {
    fn from(r: FacetsResponse) -> Self {
        WidgetResponse::Facets(r)
    }
}

impl From<TimeSeriesResponse> for WidgetResponse {
    fn from(r: TimeSeriesResponse) -> Self {
        WidgetResponse::TimeSeries(r)
    }
}
