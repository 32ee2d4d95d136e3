//! Response envelopes.
//!
//! Every response leaving the proxy is assembled here so that CORS headers and a single
//! `Content-Type` are always present, whatever the outcome.
use axum::body::Body as AxumBody;
use http::{HeaderValue, Response, StatusCode, header};
use serde::Serialize;
use serde_json::json;

use super::cors::apply_cors_headers;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Shared-cache lifetime attached to successful upstream payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDirective {
    pub max_age_secs: u64,
}

impl CacheDirective {
    pub fn shared(max_age_secs: u64) -> Self {
        Self { max_age_secs }
    }

    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("s-maxage={}", self.max_age_secs))
            .unwrap_or_else(|_| HeaderValue::from_static("no-store"))
    }
}

fn finish(status: StatusCode, body: AxumBody, content_type: &'static str) -> Response<AxumBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    apply_cors_headers(headers);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Serialize `payload` as the JSON body of a response with `status`.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, payload: &T) -> Response<AxumBody> {
    match serde_json::to_vec(payload) {
        Ok(bytes) => finish(status, AxumBody::from(bytes), JSON_CONTENT_TYPE),
        Err(e) => {
            tracing::error!("Failed to serialize response payload: {}", e);
            finish(
                StatusCode::INTERNAL_SERVER_ERROR,
                AxumBody::from(r#"{"error":"Failed to encode response"}"#),
                JSON_CONTENT_TYPE,
            )
        }
    }
}

/// `{"error": message}` with the given status.
pub fn error(status: StatusCode, message: &str) -> Response<AxumBody> {
    json(status, &json!({ "error": message }))
}

/// `{"error": message, "status": upstream_status}`.
pub fn error_with_status(
    status: StatusCode,
    message: &str,
    upstream_status: StatusCode,
) -> Response<AxumBody> {
    json(
        status,
        &json!({ "error": message, "status": upstream_status.as_u16() }),
    )
}

pub fn plain_text(status: StatusCode, text: &'static str) -> Response<AxumBody> {
    finish(status, AxumBody::from(text), TEXT_CONTENT_TYPE)
}

/// 200 response around an upstream body, streamed without inspection.
pub fn passthrough(body: AxumBody, cache: CacheDirective) -> Response<AxumBody> {
    with_cache(finish(StatusCode::OK, body, JSON_CONTENT_TYPE), cache)
}

pub fn with_cache(mut response: Response<AxumBody>, cache: CacheDirective) -> Response<AxumBody> {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, cache.header_value());
    response
}
