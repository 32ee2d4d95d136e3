// Shared harness for the router-level integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{Router, body::Body};
use bytes::Bytes;
use http::{HeaderMap, Request, Response, StatusCode};
use http_body_util::BodyExt;
use nutrigate::{
    HttpHandler, MemoryCounterStore, ProxyService,
    adapters::router,
    config::ProxyConfig,
    ports::{
        counter_store::CounterStore,
        http_client::{HttpClient, HttpClientError, HttpClientResult},
    },
};
use tower::ServiceExt;

pub const USDA_BASE: &str = "https://usda.test/fdc/v1";
pub const OFF_BASE: &str = "https://off.test";

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub uri: String,
    pub headers: HeaderMap,
}

impl CapturedRequest {
    pub fn path(&self) -> String {
        self.uri
            .parse::<http::Uri>()
            .map(|uri| uri.path().to_string())
            .unwrap_or_default()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        url::Url::parse(&self.uri)
            .ok()?
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

#[derive(Clone)]
struct CannedResponse {
    path_suffix: String,
    status: StatusCode,
    body: String,
}

/// Fake upstream: answers by URI path suffix and records every request it sees.
#[derive(Default)]
pub struct FakeUpstream {
    responses: Mutex<Vec<CannedResponse>>,
    unreachable: bool,
    captured: Mutex<Vec<CapturedRequest>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn respond(self, path_suffix: &str, status: StatusCode, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(CannedResponse {
                path_suffix: path_suffix.to_string(),
                status,
                body: body.to_string(),
            });
        self
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.captured.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for FakeUpstream {
    async fn send_request(&self, req: Request<Body>) -> HttpClientResult<Response<Body>> {
        let uri = req.uri().to_string();
        let path = req.uri().path().to_string();
        self.captured.lock().unwrap().push(CapturedRequest {
            uri,
            headers: req.headers().clone(),
        });

        if self.unreachable {
            return Err(HttpClientError::ConnectionError(
                "connection refused".to_string(),
            ));
        }

        let canned = self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|c| path.ends_with(&c.path_suffix))
            .cloned();

        let (status, body) = match canned {
            Some(c) => (c.status, c.body),
            None => (StatusCode::NOT_FOUND, r#"{"status":"not found"}"#.to_string()),
        };

        Ok(Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .header("x-upstream-only", "leak")
            .body(Body::from(body))
            .unwrap())
    }
}

pub fn test_config() -> ProxyConfig {
    ProxyConfig::builder()
        .usda_api_key("TEST_KEY")
        .usda_base_url(USDA_BASE)
        .off_base_url(OFF_BASE)
        .build()
}

pub fn app_with(
    config: ProxyConfig,
    upstream: Arc<FakeUpstream>,
    store: Option<Arc<dyn CounterStore>>,
) -> Router {
    let config = Arc::new(config);
    let client: Arc<dyn HttpClient> = upstream;
    let service = Arc::new(ProxyService::new(config.clone(), client, store).unwrap());
    router(Arc::new(HttpHandler::new(service, &config).unwrap()))
}

/// Default config, in-memory counter store.
pub fn app(upstream: Arc<FakeUpstream>) -> Router {
    let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
    app_with(test_config(), upstream, Some(store))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(req).await.unwrap();
    let (parts, body) = response.into_parts();
    TestResponse {
        status: parts.status,
        headers: parts.headers,
        body: body.collect().await.unwrap().to_bytes(),
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_as(app: &Router, uri: &str, client_ip: &str) -> TestResponse {
    send(
        app,
        Request::get(uri)
            .header("cf-connecting-ip", client_ip)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub fn assert_cors(response: &TestResponse) {
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    assert_eq!(
        response.header("access-control-allow-methods"),
        Some("GET, HEAD, POST, OPTIONS")
    );
    assert_eq!(
        response.header("access-control-allow-headers"),
        Some("Content-Type, Authorization")
    );
}
