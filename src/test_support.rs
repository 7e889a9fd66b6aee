//! In-process mock of the bank API for tests.
//!
//! Routes are keyed by method, path and optional `page` query value. Every
//! request is recorded so tests can assert on headers, bodies and call counts.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::api::BankClient;

type RouteKey = (Method, String, Option<u32>);

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub page: Option<u32>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

struct MockState {
    routes: HashMap<RouteKey, (StatusCode, Value)>,
    delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Default)]
pub struct MockBankBuilder {
    routes: HashMap<RouteKey, (StatusCode, Value)>,
    delay: Option<Duration>,
}

impl MockBankBuilder {
    /// Respond to `method path` regardless of the `page` query
    pub fn respond(mut self, method: Method, path: &str, status: StatusCode, body: Value) -> Self {
        self.routes.insert((method, path.to_string(), None), (status, body));
        self
    }

    /// Respond 200 to `GET path?page=N`
    pub fn page(self, path: &str, page: u32, body: Value) -> Self {
        self.page_status(path, page, StatusCode::OK, body)
    }

    pub fn page_status(mut self, path: &str, page: u32, status: StatusCode, body: Value) -> Self {
        self.routes
            .insert((Method::GET, path.to_string(), Some(page)), (status, body));
        self
    }

    /// Delay every response
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Standard login and token routes handing out `rt-1` / `at-1`
    pub fn with_auth(self) -> Self {
        self.respond(Method::POST, "/login", StatusCode::OK, json!({"refresh_token": "rt-1"}))
            .respond(Method::POST, "/token", StatusCode::OK, json!({"access_token": "at-1"}))
    }

    pub async fn start(self) -> MockBank {
        let state = Arc::new(MockState {
            routes: self.routes,
            delay: self.delay,
            requests: Mutex::new(Vec::new()),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock bank");
        let addr = listener.local_addr().expect("mock bank address");

        let app = Router::new().fallback(handle).with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        MockBank {
            url: format!("http://{}", addr),
            state,
        }
    }
}

pub struct MockBank {
    url: String,
    state: Arc<MockState>,
}

impl MockBank {
    pub fn builder() -> MockBankBuilder {
        MockBankBuilder::default()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&self.url).expect("mock bank url")
    }

    pub fn client(&self, timeout: Duration) -> BankClient {
        BankClient::new(self.base_url(), timeout).expect("client")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Paths of recorded requests, with the page number appended when present
    pub fn request_log(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| match r.page {
                Some(page) => format!("{} {}?page={}", r.method, r.path, page),
                None => format!("{} {}", r.method, r.path),
            })
            .collect()
    }
}

/// URL of a local port that nothing listens on
pub async fn closed_port_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    Url::parse(&format!("http://{}", addr)).expect("closed port url")
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let page = uri.query().and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse::<u32>().ok())
    });
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        page,
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    let path = uri.path().to_string();
    let route = state
        .routes
        .get(&(method.clone(), path.clone(), page))
        .or_else(|| state.routes.get(&(method, path, None)));

    match route {
        Some((status, body)) => (*status, Json(body.clone())).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response(),
    }
}
