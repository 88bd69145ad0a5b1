//! Shared helpers for router tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use optica::data_service::InMemoryDataService;
use optica::http_server::{build_router, AppState, HttpServerConfig};

pub struct TestApp {
    pub data: Arc<InMemoryDataService>,
    pub state: AppState,
}

impl TestApp {
    pub fn new(data: InMemoryDataService) -> Self {
        let data = Arc::new(data);
        let state = AppState::new(data.clone());
        Self { data, state }
    }

    pub fn with_max_append_attempts(mut self, attempts: u32) -> Self {
        self.state = self.state.with_max_append_attempts(attempts);
        self
    }

    pub fn router(&self) -> Router {
        build_router(&HttpServerConfig::default(), self.state.clone())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body.to_string())).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(body.to_string())).await
    }

    pub async fn send(&self, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
