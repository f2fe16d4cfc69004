//! Async runner for one dashboard view.
//!
//! [`Dashboard::spawn`] starts a task that owns a [`DashboardState`]. Callers
//! talk to it through the cloneable [`Dashboard`] handle; every state change
//! is published on a `watch` channel. Each recomputation replaces the
//! in-flight `JoinSet`, which aborts fetches of the superseded generation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::client::AnalyticsClient;
use crate::error::{DashboardError, FetchError};
use crate::filter::{self, SelectedFilter};
use crate::query::QueryParams;
use crate::state::{DashboardSnapshot, DashboardState, FetchOutcome, FetchTask};
use crate::widget::Widget;

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// Upper bound on a single widget fetch.
    pub fetch_timeout: Duration,
    pub command_buffer: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            command_buffer: 32,
        }
    }
}

/// Query parameters pushed by a filter-bar selection, with the resulting
/// loading snapshot.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub query_params: QueryParams,
    pub snapshot: DashboardSnapshot,
}

enum Command {
    Navigate {
        params: QueryParams,
        reply: oneshot::Sender<DashboardSnapshot>,
    },
    SelectFilters {
        filters: Vec<SelectedFilter>,
        reply: oneshot::Sender<Navigation>,
    },
    Refresh {
        reply: oneshot::Sender<DashboardSnapshot>,
    },
    ReplaceWidgets {
        widgets: Vec<Widget>,
        reply: oneshot::Sender<DashboardSnapshot>,
    },
}

// ------------------------------------------------------------------ //
//  Handle                                                             //
// ------------------------------------------------------------------ //

/// Handle to a running dashboard view. The view stops once every handle is
/// dropped.
#[derive(Clone)]
pub struct Dashboard {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<DashboardSnapshot>,
}

impl Dashboard {
    /// Start a dashboard view. No fetch happens until the first
    /// [`navigate`](Self::navigate).
    pub fn spawn(
        client: Arc<dyn AnalyticsClient>,
        filters: Vec<serde_json::Value>,
        widget_configs: Vec<Widget>,
        options: DashboardOptions,
    ) -> Self {
        let state = DashboardState::new(filters, widget_configs);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());
        let (command_tx, command_rx) = mpsc::channel(options.command_buffer.max(1));

        let engine = Engine {
            state,
            client,
            options,
            snapshots: snapshot_tx,
            in_flight: JoinSet::new(),
        };
        tokio::spawn(engine.run(command_rx));

        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    /// Apply new query parameters. Returns the snapshot published before any
    /// fetch of the new generation completes.
    pub async fn navigate(&self, params: QueryParams) -> Result<DashboardSnapshot, DashboardError> {
        self.request(|reply| Command::Navigate { params, reply }).await
    }

    /// Encode a filter-bar selection into query parameters and navigate to
    /// them.
    pub async fn select_filters(
        &self,
        filters: Vec<SelectedFilter>,
    ) -> Result<Navigation, DashboardError> {
        self.request(|reply| Command::SelectFilters { filters, reply }).await
    }

    /// Re-fetch every widget without touching filters or time range.
    pub async fn refresh(&self) -> Result<DashboardSnapshot, DashboardError> {
        self.request(|reply| Command::Refresh { reply }).await
    }

    pub async fn replace_widgets(
        &self,
        widgets: Vec<Widget>,
    ) -> Result<DashboardSnapshot, DashboardError> {
        self.request(|reply| Command::ReplaceWidgets { widgets, reply }).await
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DashboardError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| DashboardError::Stopped)?;
        rx.await.map_err(|_| DashboardError::Stopped)
    }
}

// ------------------------------------------------------------------ //
//  Engine task                                                        //
// ------------------------------------------------------------------ //

struct Engine {
    state: DashboardState,
    client: Arc<dyn AnalyticsClient>,
    options: DashboardOptions,
    snapshots: watch::Sender<DashboardSnapshot>,
    in_flight: JoinSet<FetchOutcome>,
}

impl Engine {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(joined) = self.in_flight.join_next() => match joined {
                    Ok(outcome) => self.complete(outcome),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => error!(error = %e, "widget fetch task failed"),
                },
            }
        }
        debug!(generation = self.state.generation(), "dashboard engine stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Navigate { params, reply } => {
                let tasks = self.state.navigate(params, Utc::now());
                let _ = reply.send(self.start(tasks));
            }
            Command::SelectFilters { filters, reply } => {
                let query_params = filter::encode(&filters);
                let tasks = self.state.navigate(query_params.clone(), Utc::now());
                let snapshot = self.start(tasks);
                let _ = reply.send(Navigation {
                    query_params,
                    snapshot,
                });
            }
            Command::Refresh { reply } => {
                let tasks = self.state.refresh();
                let _ = reply.send(self.start(tasks));
            }
            Command::ReplaceWidgets { widgets, reply } => {
                let tasks = self.state.replace_widgets(widgets, Utc::now());
                let _ = reply.send(self.start(tasks));
            }
        }
    }

    /// Publish the loading state of a new generation and spawn its fetches.
    fn start(&mut self, tasks: Vec<FetchTask>) -> DashboardSnapshot {
        self.in_flight = JoinSet::new();

        let snapshot = self.state.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        info!(
            generation = snapshot.generation,
            fetches = tasks.len(),
            "dashboard recomputed"
        );

        for task in tasks {
            let client = Arc::clone(&self.client);
            let timeout = self.options.fetch_timeout;
            self.in_flight.spawn(async move {
                let fetch = client.fetch(&task.request);
                let result = match tokio::time::timeout(timeout, fetch).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(timeout)),
                };
                FetchOutcome {
                    generation: task.generation,
                    index: task.index,
                    widget_id: task.widget_id,
                    result,
                }
            });
        }

        snapshot
    }

    fn complete(&mut self, outcome: FetchOutcome) {
        let generation = outcome.generation;
        let widget_id = outcome.widget_id.clone();
        let failure = outcome.result.as_ref().err().map(ToString::to_string);

        if !self.state.apply(outcome) {
            debug!(generation, widget_id = %widget_id, "discarding stale widget response");
            return;
        }

        match failure {
            Some(error) => {
                warn!(generation, widget_id = %widget_id, error = %error, "widget fetch failed")
            }
            None => debug!(generation, widget_id = %widget_id, "widget loaded"),
        }
        self.snapshots.send_replace(self.state.snapshot());
    }
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FakeAnalyticsClient, FakeReply};
    use crate::request::{FacetsRequest, MeasuresRequest, WidgetRequest};
    use crate::response::{
        FacetsResponse, Measure, MeasuresResponse, MetricMeasures, WidgetResponse,
    };
    use crate::time_frame::TimeRange;

    fn range() -> TimeRange {
        TimeRange::new("2025-01-01T00:00:00Z", "2025-01-31T23:59:59Z")
    }

    fn measures_widget(id: &str) -> Widget {
        Widget::new(id, "Hits", "stats").with_request(WidgetRequest::Measures(MeasuresRequest {
            time_range: range(),
            filters: None,
            metrics: vec![],
        }))
    }

    fn facets_widget(id: &str) -> Widget {
        Widget::new(id, "Status", "doughnut").with_request(WidgetRequest::Facets(FacetsRequest {
            time_range: range(),
            by: vec!["HTTP_STATUS_CODE_GROUP".into()],
            filters: None,
            metrics: vec![],
            limit: None,
        }))
    }

    fn count(value: f64) -> WidgetResponse {
        WidgetResponse::Measures(MeasuresResponse {
            metrics: vec![MetricMeasures {
                name: "HTTP_REQUESTS".into(),
                measures: vec![Measure { name: "COUNT".into(), value }],
            }],
        })
    }

    fn custom_day() -> QueryParams {
        serde_json::from_value(serde_json::json!({
            "period": "custom",
            "from": "1704067200000",
            "to": "1704153600000"
        }))
        .unwrap()
    }

    fn spawn(fake: &FakeAnalyticsClient, widgets: Vec<Widget>) -> Dashboard {
        Dashboard::spawn(Arc::new(fake.clone()), vec![], widgets, DashboardOptions::default())
    }

    #[tokio::test]
    async fn loads_widgets_with_requests() {
        let fake = FakeAnalyticsClient::new(|req| match req {
            WidgetRequest::Facets(_) => {
                FakeReply::Respond(WidgetResponse::Facets(FacetsResponse { metrics: vec![] }))
            }
            _ => FakeReply::Respond(count(100.0)),
        });
        let dashboard = spawn(
            &fake,
            vec![measures_widget("1"), Widget::new("2", "Notes", "text"), facets_widget("3")],
        );

        let loading = dashboard.navigate(custom_day()).await.unwrap();
        assert_eq!(loading.generation, 1);
        assert!(loading.widgets.iter().all(|w| w.response.is_none()));

        let mut rx = dashboard.subscribe();
        let loaded = rx
            .wait_for(|s| s.widgets[0].response.is_some() && s.widgets[2].response.is_some())
            .await
            .unwrap()
            .clone();

        assert_eq!(loaded.widgets[0].response, Some(count(100.0)));
        assert!(matches!(loaded.widgets[2].response, Some(WidgetResponse::Facets(_))));
        assert!(loaded.widgets[1].response.is_none());
        assert_eq!(fake.call_count(), 2);
    }

    #[tokio::test]
    async fn slow_widget_does_not_block_others() {
        let fake = FakeAnalyticsClient::new(|req| match req {
            WidgetRequest::Facets(_) => FakeReply::Hang,
            _ => FakeReply::Respond(count(1.0)),
        });
        let dashboard = spawn(&fake, vec![measures_widget("1"), facets_widget("2")]);
        dashboard.navigate(custom_day()).await.unwrap();

        let mut rx = dashboard.subscribe();
        let snapshot = rx
            .wait_for(|s| s.widgets[0].response.is_some())
            .await
            .unwrap()
            .clone();
        assert!(snapshot.widgets[1].is_loading());
    }

    #[tokio::test]
    async fn failing_widget_is_isolated() {
        let fake = FakeAnalyticsClient::new(|req| match req {
            WidgetRequest::Facets(_) => FakeReply::Fail("facets unavailable".into()),
            _ => FakeReply::Respond(count(7.0)),
        });
        let dashboard = spawn(&fake, vec![measures_widget("1"), facets_widget("2")]);
        dashboard.navigate(custom_day()).await.unwrap();

        let mut rx = dashboard.subscribe();
        let snapshot = rx
            .wait_for(|s| s.widgets[0].response.is_some() && s.widgets[1].error.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.widgets[1].error.as_deref(), Some("facets unavailable"));
        assert!(snapshot.widgets[1].response.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_navigation_supersedes_slow_fetch() {
        let fake = FakeAnalyticsClient::new(|req| {
            let slow = req
                .filters()
                .map(|f| f.iter().any(|f| f.value.contains(&"old".to_string())))
                .unwrap_or(false);
            if slow {
                FakeReply::Delayed(Duration::from_secs(10), count(1.0))
            } else {
                FakeReply::Delayed(Duration::from_secs(1), count(2.0))
            }
        });
        let dashboard = spawn(&fake, vec![measures_widget("1")]);

        let mut old = custom_day();
        old.insert("API", "old");
        let mut new = custom_day();
        new.insert("API", "new");

        dashboard.navigate(old).await.unwrap();
        let loading = dashboard.navigate(new).await.unwrap();
        assert_eq!(loading.generation, 2);

        let mut rx = dashboard.subscribe();
        rx.wait_for(|s| s.widgets[0].response.is_some()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.widgets[0].response, Some(count(2.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_times_out() {
        let fake = FakeAnalyticsClient::new(|_| FakeReply::Hang);
        let dashboard = Dashboard::spawn(
            Arc::new(fake.clone()),
            vec![],
            vec![measures_widget("1")],
            DashboardOptions {
                fetch_timeout: Duration::from_secs(2),
                ..Default::default()
            },
        );
        dashboard.navigate(custom_day()).await.unwrap();

        let mut rx = dashboard.subscribe();
        let snapshot = rx
            .wait_for(|s| s.widgets[0].error.is_some())
            .await
            .unwrap()
            .clone();
        assert!(snapshot.widgets[0].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn refresh_refetches_with_same_requests() {
        let fake = FakeAnalyticsClient::always(count(3.0));
        let dashboard = spawn(&fake, vec![measures_widget("1")]);
        dashboard.navigate(custom_day()).await.unwrap();

        let mut rx = dashboard.subscribe();
        let first = rx
            .wait_for(|s| s.widgets[0].response.is_some())
            .await
            .unwrap()
            .clone();

        let loading = dashboard.refresh().await.unwrap();
        assert_eq!(loading.generation, first.generation + 1);
        assert!(loading.widgets[0].response.is_none());
        assert_eq!(loading.widgets[0].request, first.widgets[0].request);
        assert_eq!(loading.resolved, first.resolved);

        rx.wait_for(|s| s.generation == loading.generation && s.widgets[0].response.is_some())
            .await
            .unwrap();
        let calls = fake.snapshot();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
    }

    #[tokio::test]
    async fn select_filters_pushes_query_params() {
        let fake = FakeAnalyticsClient::always(count(1.0));
        let dashboard = spawn(&fake, vec![measures_widget("1")]);

        let navigation = dashboard
            .select_filters(vec![
                SelectedFilter::new("period", "1d"),
                SelectedFilter::new("API", "api-1"),
                SelectedFilter::new("API", "api-2"),
            ])
            .await
            .unwrap();

        let expected: QueryParams = serde_json::from_value(serde_json::json!({
            "period": "1d",
            "API": "api-1,api-2"
        }))
        .unwrap();
        assert_eq!(navigation.query_params, expected);
        assert_eq!(navigation.snapshot.selected_filters.len(), 3);

        let request = navigation.snapshot.widgets[0].request.as_ref().unwrap();
        let api = &request.filters().unwrap()[0];
        assert_eq!(api.value, vec!["api-1".to_string(), "api-2".to_string()]);
        assert_eq!(navigation.snapshot.resolved.as_ref().unwrap().interval, 600_000);
    }

    #[tokio::test]
    async fn replace_widgets_fetches_new_configs() {
        let fake = FakeAnalyticsClient::always(count(5.0));
        let dashboard = spawn(&fake, vec![]);
        dashboard.navigate(custom_day()).await.unwrap();

        let loading = dashboard
            .replace_widgets(vec![measures_widget("a"), measures_widget("b")])
            .await
            .unwrap();
        assert_eq!(loading.widgets.len(), 2);
        assert_eq!(
            loading.widgets[0].request.as_ref().unwrap().time_range().from,
            "2024-01-01T00:00:00.000Z"
        );

        let mut rx = dashboard.subscribe();
        rx.wait_for(|s| s.widgets.iter().all(|w| w.response.is_some()))
            .await
            .unwrap();
        assert_eq!(fake.call_count(), 2);
    }

    #[tokio::test]
    async fn dropping_last_handle_stops_engine() {
        let fake = FakeAnalyticsClient::always(count(1.0));
        let dashboard = spawn(&fake, vec![measures_widget("1")]);
        let mut rx = dashboard.subscribe();
        drop(dashboard);
        assert!(rx.changed().await.is_err());
    }
}
