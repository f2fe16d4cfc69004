//! Analytics dashboard engine.
//!
//! Keeps a dashboard's filter selection and time period in sync with the
//! query string, resolves the period into an absolute range and bucket
//! interval, rebuilds every widget's analytics request from that state, and
//! fetches the results concurrently.
//!
//! ```text
//! QueryParams ─decode─▶ SelectedFilter[] ─resolve─▶ ResolvedTimeRange
//!                                   │                      │
//!                                   └──group──▶ RequestFilter[]
//!                                                          ▼
//!                  Widget[] ◀─merge─ fetch ◀─ build_requests(widgets)
//! ```
//!
//! [`DashboardState`] holds the pure transitions; [`Dashboard`] runs them on a
//! tokio task and performs the fetches.

pub mod builder;
pub mod client;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod query;
pub mod request;
pub mod response;
pub mod state;
pub mod time_frame;
pub mod widget;

pub use client::{AnalyticsClient, FakeAnalyticsClient, FakeReply, HttpAnalyticsClient};
pub use dashboard::{Dashboard, DashboardOptions, Navigation};
pub use error::{DashboardError, FetchError};
pub use filter::SelectedFilter;
pub use query::{QueryParams, QueryValue};
pub use request::{RequestFilter, WidgetRequest};
pub use response::WidgetResponse;
pub use state::{DashboardSnapshot, DashboardState};
pub use time_frame::{ResolvedTimeRange, TimeRange};
pub use widget::{Widget, WidgetLayout};
