//! Dashboard widget configuration and live state.

use serde::{Deserialize, Serialize};

use crate::request::WidgetRequest;
use crate::response::WidgetResponse;

/// Grid placement, opaque to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetLayout {
    pub cols: u32,
    pub rows: u32,
    pub x: u32,
    pub y: u32,
}

/// A dashboard tile.
///
/// `response` is `None` until the fetch for the current `request` completes;
/// `error` holds the failure of that fetch, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub title: String,
    /// Presentation kind (`stats`, `doughnut`, `line`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub layout: WidgetLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<WidgetRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<WidgetResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Widget {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: kind.into(),
            layout: WidgetLayout::default(),
            request: None,
            response: None,
            error: None,
        }
    }

    pub fn with_request(mut self, request: WidgetRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Has a request whose fetch has not completed yet.
    pub fn is_loading(&self) -> bool {
        self.request.is_some() && self.response.is_none() && self.error.is_none()
    }

    pub(crate) fn invalidate(&mut self) {
        self.response = None;
        self.error = None;
    }
}
