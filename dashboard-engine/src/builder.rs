//! Rebuilds widget requests from the current filter selection.

use crate::request::{RequestFilter, WidgetRequest};
use crate::time_frame::ResolvedTimeRange;
use crate::widget::Widget;

/// Apply `resolved` and `filters` to every widget that declares a request.
///
/// Widgets without a request are returned unchanged. All others lose their
/// cached response, even when the rebuilt request equals the previous one.
pub fn build_requests(
    widgets: &[Widget],
    resolved: &ResolvedTimeRange,
    filters: &[RequestFilter],
) -> Vec<Widget> {
    widgets
        .iter()
        .map(|widget| {
            let Some(request) = &widget.request else {
                return widget.clone();
            };
            let mut rebuilt = widget.clone();
            rebuilt.request = Some(rebuild_request(request, resolved, filters));
            rebuilt.invalidate();
            rebuilt
        })
        .collect()
}

fn rebuild_request(
    request: &WidgetRequest,
    resolved: &ResolvedTimeRange,
    filters: &[RequestFilter],
) -> WidgetRequest {
    let filters = (!filters.is_empty()).then(|| filters.to_vec());
    let time_range = resolved.time_range.clone();

    match request {
        WidgetRequest::Measures(r) => {
            let mut r = r.clone();
            r.time_range = time_range;
            r.filters = filters;
            WidgetRequest::Measures(r)
        }
        WidgetRequest::Facets(r) => {
            let mut r = r.clone();
            r.time_range = time_range;
            r.filters = filters;
            WidgetRequest::Facets(r)
        }
        WidgetRequest::TimeSeries(r) => {
            let mut r = r.clone();
            r.time_range = time_range;
            r.filters = filters;
            r.interval = resolved.interval;
            WidgetRequest::TimeSeries(r)
        }
    }
}
