//! Axum middleware attached to the proxy router.
//!
//! These stay stateless: request id propagation, request timing logs and the
//! `nosniff` hardening header. CORS is not handled here because every envelope
//! already carries its own CORS headers.
use std::time::Instant;

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Per-request identifier, stored in request extensions for the handler's span.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Log start/end of a request including latency. Only the path is logged.
pub async fn request_timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    tracing::debug!("Started processing {} {}", method, path);

    let response = next.run(req).await;

    tracing::info!(
        "Completed {} {} - {} in {:?}",
        method,
        path,
        response.status(),
        start.elapsed()
    );

    response
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response.headers_mut().insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    response
}

/// Generate a per-request UUID and expose it to the handler plus `X-Request-ID`.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}
