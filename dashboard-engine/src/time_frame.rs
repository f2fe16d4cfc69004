//! Period catalog and time range resolution.
//!
//! A period selector is either a named [`TimeFrame`] (`"5m"`, `"1d"`, ...)
//! anchored on "now", or `"custom"` with explicit epoch-millisecond bounds.
//! Both resolve to a [`ResolvedTimeRange`]: the absolute window plus the
//! bucket width used by time-series widgets.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Reserved period id selecting explicit `from`/`to` bounds.
pub const CUSTOM_PERIOD: &str = "custom";

/// Period used when none is selected or the selection cannot be resolved.
pub const DEFAULT_PERIOD: &str = "5m";

/// Upper bound on the number of buckets a custom range is split into.
pub const MAX_BUCKETS: u64 = 120;

const SECOND: u64 = 1_000;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

// ------------------------------------------------------------------ //
//  Types                                                              //
// ------------------------------------------------------------------ //

/// Named period from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFrame {
    pub id: &'static str,
    pub duration_ms: u64,
    /// Predefined bucket width in milliseconds.
    pub interval_ms: u64,
}

impl TimeFrame {
    const fn new(id: &'static str, duration_ms: u64, interval_ms: u64) -> Self {
        Self {
            id,
            duration_ms,
            interval_ms,
        }
    }
}

/// Absolute window sent to the analytics API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

impl TimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Render two instants as ISO-8601 with millisecond precision.
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: iso(from),
            to: iso(to),
        }
    }
}

/// Outcome of resolving a period selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTimeRange {
    pub time_range: TimeRange,
    /// Bucket width in milliseconds.
    pub interval: u64,
}

// ------------------------------------------------------------------ //
//  Catalog                                                            //
// ------------------------------------------------------------------ //

pub const TIME_FRAMES: &[TimeFrame] = &[
    TimeFrame::new("1m", MINUTE, 2 * SECOND),
    TimeFrame::new("5m", 5 * MINUTE, 10 * SECOND),
    TimeFrame::new("1h", HOUR, MINUTE),
    TimeFrame::new("1d", DAY, 10 * MINUTE),
    TimeFrame::new("3d", 3 * DAY, 30 * MINUTE),
    TimeFrame::new("7d", 7 * DAY, HOUR),
    TimeFrame::new("14d", 14 * DAY, 3 * HOUR),
    TimeFrame::new("30d", 30 * DAY, 6 * HOUR),
    TimeFrame::new("90d", 90 * DAY, 12 * HOUR),
];

/// Look up a named period. `"custom"` is never in the catalog.
pub fn find_time_frame(id: &str) -> Option<&'static TimeFrame> {
    TIME_FRAMES.iter().find(|tf| tf.id == id)
}

fn default_time_frame() -> &'static TimeFrame {
    // DEFAULT_PERIOD is always present in TIME_FRAMES.
    &TIME_FRAMES[1]
}

// ------------------------------------------------------------------ //
//  Resolution                                                         //
// ------------------------------------------------------------------ //

/// Resolve a period selection against `now`.
///
/// Never fails: unknown periods and malformed custom bounds fall back to
/// [`DEFAULT_PERIOD`].
pub fn resolve_time_range(
    period: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    now: DateTime<Utc>,
) -> ResolvedTimeRange {
    if period == Some(CUSTOM_PERIOD) {
        if let Some(resolved) = resolve_custom(from, to) {
            return resolved;
        }
        tracing::debug!(?from, ?to, "invalid custom bounds, using default period");
    }

    let frame = match period.filter(|p| *p != CUSTOM_PERIOD) {
        Some(id) => find_time_frame(id).unwrap_or_else(|| {
            tracing::debug!(period = id, "unknown period, using default");
            default_time_frame()
        }),
        None => default_time_frame(),
    };

    let start = now - chrono::Duration::milliseconds(frame.duration_ms as i64);
    ResolvedTimeRange {
        time_range: TimeRange::between(start, now),
        interval: frame.interval_ms,
    }
}

fn resolve_custom(from: Option<&str>, to: Option<&str>) -> Option<ResolvedTimeRange> {
    let from_ms: i64 = from?.trim().parse().ok()?;
    let to_ms: i64 = to?.trim().parse().ok()?;
    let start = DateTime::<Utc>::from_timestamp_millis(from_ms)?;
    let end = DateTime::<Utc>::from_timestamp_millis(to_ms)?;
    Some(ResolvedTimeRange {
        time_range: TimeRange::between(start, end),
        interval: custom_interval(from_ms, to_ms),
    })
}

// ------------------------------------------------------------------ //
//  Custom interval                                                    //
// ------------------------------------------------------------------ //

const INTERVAL_LADDER: &[u64] = &[
    SECOND,
    2 * SECOND,
    5 * SECOND,
    10 * SECOND,
    30 * SECOND,
    MINUTE,
    2 * MINUTE,
    5 * MINUTE,
    10 * MINUTE,
    30 * MINUTE,
    HOUR,
    3 * HOUR,
    6 * HOUR,
    12 * HOUR,
    DAY,
    2 * DAY,
    7 * DAY,
    30 * DAY,
];

/// Bucket width for an arbitrary `[from, to]` span in epoch milliseconds.
///
/// Picks the smallest round interval giving at most [`MAX_BUCKETS`] buckets.
/// Always positive.
pub fn custom_interval(from_ms: i64, to_ms: i64) -> u64 {
    let span = to_ms.saturating_sub(from_ms).max(0) as u64;
    if let Some(interval) = INTERVAL_LADDER
        .iter()
        .copied()
        .find(|interval| span.div_ceil(*interval) <= MAX_BUCKETS)
    {
        return interval;
    }
    let raw = span.div_ceil(MAX_BUCKETS);
    raw.div_ceil(DAY) * DAY
}

fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //
