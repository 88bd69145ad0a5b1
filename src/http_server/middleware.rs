//! Request observation middleware
//!
//! Assigns each request an id (echoed in `x-request-id`), counts the response
//! by status class and logs one `HTTP_REQUEST` line.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::observability::{Logger, MetricsRegistry, Severity};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn observe_request(
    State(metrics): State<Arc<MetricsRegistry>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(request).await;

    let status = response.status();
    metrics.record_response(status.as_u16());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let severity = if status.is_server_error() {
        Severity::Error
    } else {
        Severity::Info
    };
    Logger::log(
        severity,
        "HTTP_REQUEST",
        &[
            ("duration_ms", started.elapsed().as_millis().to_string().as_str()),
            ("method", method.as_str()),
            ("path", path.as_str()),
            ("request_id", request_id.as_str()),
            ("status", status.as_str()),
        ],
    );

    response
}
