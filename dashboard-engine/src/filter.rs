//! Selected-filter codec.
//!
//! Maps the query string to the filter bar's list of [`SelectedFilter`]s and
//! back. `period`, `from` and `to` are scalar keys; every other key names a
//! filter whose values travel comma-separated.

use serde::{Deserialize, Serialize};

use crate::query::{QueryParams, QueryValue};
use crate::request::RequestFilter;
use crate::time_frame::CUSTOM_PERIOD;

pub const PERIOD_KEY: &str = "period";
pub const FROM_KEY: &str = "from";
pub const TO_KEY: &str = "to";

/// Keys that never become request filters.
pub const RESERVED_KEYS: [&str; 3] = [PERIOD_KEY, FROM_KEY, TO_KEY];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// One selected value of one filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFilter {
    pub parent_key: String,
    pub value: String,
}

impl SelectedFilter {
    pub fn new(parent_key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parent_key: parent_key.into(),
            value: value.into(),
        }
    }
}

// ------------------------------------------------------------------ //
//  Decode                                                             //
// ------------------------------------------------------------------ //

/// Query parameters → selected filters.
pub fn decode(params: &QueryParams) -> Vec<SelectedFilter> {
    let mut selected = Vec::new();

    for (key, raw) in params.iter() {
        let Some(joined) = raw.joined() else {
            continue;
        };

        // Scalars pass through verbatim; resolution validates them.
        if is_reserved(key) {
            selected.push(SelectedFilter::new(key, joined));
            continue;
        }

        selected.extend(
            joined
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| SelectedFilter::new(key, token)),
        );
    }

    selected
}

// ------------------------------------------------------------------ //
//  Encode                                                             //
// ------------------------------------------------------------------ //

/// Selected filters → query parameters.
///
/// `from`/`to` are only written for the custom period.
pub fn encode(filters: &[SelectedFilter]) -> QueryParams {
    let mut params = QueryParams::new();
    let selection = PeriodSelection::from_filters(filters);

    if let Some(period) = &selection.period {
        params.insert(PERIOD_KEY, period.as_str());
        if selection.is_custom() {
            if let Some(from) = &selection.from {
                params.insert(FROM_KEY, from.as_str());
            }
            if let Some(to) = &selection.to {
                params.insert(TO_KEY, to.as_str());
            }
        }
    }

    for (key, values) in group_values(filters) {
        params.insert(key, QueryValue::Single(values.join(",")));
    }

    params
}

// ------------------------------------------------------------------ //
//  Grouping                                                           //
// ------------------------------------------------------------------ //

/// Non-reserved filters grouped by key, in first-appearance order.
fn group_values(filters: &[SelectedFilter]) -> Vec<(&str, Vec<String>)> {
    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
    for f in filters.iter().filter(|f| !is_reserved(&f.parent_key)) {
        match groups.iter_mut().find(|(k, _)| *k == f.parent_key) {
            Some((_, values)) => values.push(f.value.clone()),
            None => groups.push((f.parent_key.as_str(), vec![f.value.clone()])),
        }
    }
    groups
}

/// Selected filters → server-side `IN` clauses, one per filter name.
pub fn to_request_filters(filters: &[SelectedFilter]) -> Vec<RequestFilter> {
    group_values(filters)
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(key, values)| RequestFilter::any_of(key, values))
        .collect()
}

// ------------------------------------------------------------------ //
//  Period selection                                                   //
// ------------------------------------------------------------------ //

/// The scalar `period`/`from`/`to` part of a filter selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodSelection {
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl PeriodSelection {
    /// Take the first entry of each scalar key.
    pub fn from_filters(filters: &[SelectedFilter]) -> Self {
        let first = |key: &str| {
            filters
                .iter()
                .find(|f| f.parent_key == key)
                .map(|f| f.value.clone())
        };
        Self {
            period: first(PERIOD_KEY),
            from: first(FROM_KEY),
            to: first(TO_KEY),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.period.as_deref() == Some(CUSTOM_PERIOD)
    }
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //
