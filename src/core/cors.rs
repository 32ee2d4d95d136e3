//! Cross-origin headers shared by every response the proxy emits.
use axum::body::Body as AxumBody;
use http::{HeaderMap, HeaderValue, Response, StatusCode, header};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, HEAD, POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Insert (or overwrite) the CORS header set.
pub fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

/// Without a body this is the preflight answer (204); with one it is a 200.
pub fn build_cors(body: Option<AxumBody>) -> Response<AxumBody> {
    let (status, body) = match body {
        Some(body) => (StatusCode::OK, body),
        None => (StatusCode::NO_CONTENT, AxumBody::empty()),
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    apply_cors_headers(headers);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(super::envelope::JSON_CONTENT_TYPE),
    );
    response
}
