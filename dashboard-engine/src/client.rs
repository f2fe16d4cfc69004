//! Analytics API client trait and implementations.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::request::WidgetRequest;
use crate::response::{FacetsResponse, MeasuresResponse, TimeSeriesResponse, WidgetResponse};

// ------------------------------------------------------------------ //
//  Trait                                                              //
// ------------------------------------------------------------------ //

/// Executes one widget request against the analytics API.
#[async_trait]
pub trait AnalyticsClient: Send + Sync {
    async fn fetch(&self, request: &WidgetRequest) -> Result<WidgetResponse, FetchError>;
}

/// Decode an analytics payload according to the request that produced it.
pub fn decode_response(request: &WidgetRequest, body: &[u8]) -> Result<WidgetResponse, FetchError> {
    let response = match request {
        WidgetRequest::Measures(_) => serde_json::from_slice::<MeasuresResponse>(body)?.into(),
        WidgetRequest::Facets(_) => serde_json::from_slice::<FacetsResponse>(body)?.into(),
        WidgetRequest::TimeSeries(_) => serde_json::from_slice::<TimeSeriesResponse>(body)?.into(),
    };
    Ok(response)
}

// ------------------------------------------------------------------ //
//  HttpAnalyticsClient (production)                                   //
// ------------------------------------------------------------------ //

/// Posts widget requests to `{base_url}/analytics/...`.
#[derive(Clone)]
pub struct HttpAnalyticsClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpAnalyticsClient {
    pub fn new(http: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url_for(&self, request: &WidgetRequest) -> String {
        format!("{}{}", self.base_url, request.endpoint())
    }
}

#[async_trait]
impl AnalyticsClient for HttpAnalyticsClient {
    async fn fetch(&self, request: &WidgetRequest) -> Result<WidgetResponse, FetchError> {
        let url = self.url_for(request);
        debug!(url = %url, kind = request.kind(), "posting analytics request");

        let mut builder = self.http.post(&url).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await.map_err(|source| FetchError::Transport {
            url: url.clone(),
            source,
        })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url,
                status: resp.status().as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|source| FetchError::Transport { url, source })?;
        decode_response(request, &body)
    }
}

// ------------------------------------------------------------------ //
//  FakeAnalyticsClient (for tests)                                    //
// ------------------------------------------------------------------ //

/// Scripted outcome of a fake fetch.
#[derive(Debug, Clone)]
pub enum FakeReply {
    Respond(WidgetResponse),
    /// Respond after sleeping.
    Delayed(Duration, WidgetResponse),
    Fail(String),
    /// Never resolves.
    Hang,
}

type Script = dyn Fn(&WidgetRequest) -> FakeReply + Send + Sync;

/// In-memory client that records every request and answers from a script.
#[derive(Clone)]
pub struct FakeAnalyticsClient {
    script: Arc<Script>,
    pub calls: Arc<Mutex<Vec<WidgetRequest>>>,
}

impl FakeAnalyticsClient {
    pub fn new(script: impl Fn(&WidgetRequest) -> FakeReply + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every request with the same response.
    pub fn always(response: WidgetResponse) -> Self {
        Self::new(move |_| FakeReply::Respond(response.clone()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Non-destructive snapshot of the requests seen so far.
    pub fn snapshot(&self) -> Vec<WidgetRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsClient for FakeAnalyticsClient {
    async fn fetch(&self, request: &WidgetRequest) -> Result<WidgetResponse, FetchError> {
        self.calls.lock().unwrap().push(request.clone());
        match (self.script)(request) {
            FakeReply::Respond(resp) => Ok(resp),
            FakeReply::Delayed(delay, resp) => {
                tokio::time::sleep(delay).await;
                Ok(resp)
            }
            FakeReply::Fail(msg) => Err(FetchError::Other(msg)),
            FakeReply::Hang => std::future::pending().await,
        }
    }
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{FacetsRequest, MeasuresRequest};
    use crate::time_frame::TimeRange;

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;

    type Seen = Arc<Mutex<Vec<(String, serde_json::Value, Option<String>)>>>;

    async fn record(
        path: &'static str,
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        seen.lock().unwrap().push((path.to_string(), body, auth));
    }

    async fn measures_handler(
        state: State<Seen>,
        headers: HeaderMap,
        body: Json<serde_json::Value>,
    ) -> Json<serde_json::Value> {
        record("measures", state, headers, body).await;
        Json(json!({
            "metrics": [{
                "name": "HTTP_REQUESTS",
                "measures": [{ "name": "COUNT", "value": 100 }]
            }]
        }))
    }

    /// Spawn a local analytics API and return its base URL.
    async fn spawn_api(seen: Seen) -> String {
        let app = Router::new()
            .route("/analytics/measures", post(measures_handler))
            .route(
                "/analytics/facets",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .with_state(seen);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn measures() -> WidgetRequest {
        WidgetRequest::Measures(MeasuresRequest {
            time_range: TimeRange::new("2025-01-01T00:00:00Z", "2025-01-31T23:59:59Z"),
            filters: None,
            metrics: vec![],
        })
    }

    #[tokio::test]
    async fn http_client_posts_request_body() {
        let seen: Seen = Arc::default();
        let base = spawn_api(seen.clone()).await;
        let client = HttpAnalyticsClient::new(
            reqwest::Client::new(),
            &format!("{base}/"),
            Some("s3cret".into()),
        );

        let resp = client.fetch(&measures()).await.unwrap();
        match resp {
            WidgetResponse::Measures(m) => assert_eq!(m.metrics[0].measures[0].value, 100.0),
            other => panic!("unexpected response {other:?}"),
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "measures");
        assert_eq!(seen[0].1["type"], "measures");
        assert_eq!(seen[0].1["timeRange"]["from"], "2025-01-01T00:00:00Z");
        assert_eq!(seen[0].2.as_deref(), Some("Bearer s3cret"));
    }

    #[tokio::test]
    async fn http_client_reports_error_status() {
        let base = spawn_api(Arc::default()).await;
        let client = HttpAnalyticsClient::new(reqwest::Client::new(), &base, None);
        let facets = WidgetRequest::Facets(FacetsRequest {
            time_range: TimeRange::new("a", "b"),
            by: vec![],
            filters: None,
            metrics: vec![],
            limit: None,
        });

        let err = client.fetch(&facets).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }), "{err}");
    }

    #[tokio::test]
    async fn http_client_reports_unknown_endpoint() {
        let base = spawn_api(Arc::default()).await;
        let client = HttpAnalyticsClient::new(reqwest::Client::new(), &base, None);
        let ts: WidgetRequest = serde_json::from_value(json!({
            "type": "time-series",
            "timeRange": { "from": "a", "to": "b" },
            "interval": 1000,
            "metrics": []
        }))
        .unwrap();

        let err = client.fetch(&ts).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }), "{err}");
    }

    #[test]
    fn decode_uses_request_type() {
        let body = br#"{
            "metrics": [{ "name": "HTTP_REQUESTS", "buckets": [{ "key": "2xx", "measures": [] }] }]
        }"#;
        let facets = WidgetRequest::Facets(FacetsRequest {
            time_range: TimeRange::new("a", "b"),
            by: vec![],
            filters: None,
            metrics: vec![],
            limit: None,
        });
        assert!(matches!(decode_response(&facets, body), Ok(WidgetResponse::Facets(_))));
        assert!(matches!(decode_response(&measures(), body), Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn fake_client_records_calls() {
        let fake = FakeAnalyticsClient::new(|req| match req {
            WidgetRequest::Measures(_) => FakeReply::Fail("nope".into()),
            _ => FakeReply::Hang,
        });
        let err = fake.fetch(&measures()).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
        assert_eq!(fake.call_count(), 1);
        assert_eq!(fake.snapshot(), vec![measures()]);
    }
}
