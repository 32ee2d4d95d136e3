use std::fmt;

use axum::body::Body as AxumBody;
use http::{HeaderValue, Response, StatusCode, header};
use thiserror::Error;

use super::envelope;

pub const NOT_FOUND_MESSAGE: &str = "Not found. Use /usda/search or /off/search endpoints.";
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded";

/// Upstream API a request is proxied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Usda,
    OpenFoodFacts,
}

impl Upstream {
    /// Short label used in metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Upstream::Usda => "usda",
            Upstream::OpenFoodFacts => "off",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Usda => write!(f, "USDA"),
            Upstream::OpenFoodFacts => write!(f, "Open Food Facts"),
        }
    }
}

/// Every way a proxied request can fail. Each variant maps to exactly one envelope.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Missing or invalid client input.
    #[error("{0}")]
    Validation(String),

    /// The caller exhausted its window.
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The upstream answered with a non-success status.
    #[error("{upstream} API error")]
    Upstream {
        upstream: Upstream,
        status: StatusCode,
    },

    /// The upstream could not be reached or its payload could not be read.
    #[error("Failed to fetch data from {upstream} API: {reason}")]
    Transport { upstream: Upstream, reason: String },

    #[error("No route matched")]
    NotFound,
}

impl ProxyError {
    pub fn validation(message: impl Into<String>) -> Self {
        ProxyError::Validation(message.into())
    }

    pub fn transport(upstream: Upstream, reason: impl fmt::Display) -> Self {
        ProxyError::Transport {
            upstream,
            reason: reason.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn into_response(self) -> Response<AxumBody> {
        let status = self.status();
        match self {
            ProxyError::Validation(message) => envelope::error(status, &message),
            ProxyError::RateLimited { retry_after_secs } => {
                let mut response = envelope::error(status, RATE_LIMITED_MESSAGE);
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            ProxyError::Upstream {
                upstream,
                status: upstream_status,
            } => envelope::error_with_status(
                status,
                &format!("{upstream} API error"),
                upstream_status,
            ),
            // The reason stays in the logs; callers get a generic message.
            ProxyError::Transport { upstream, .. } => {
                envelope::error(status, &format!("Failed to fetch data from {upstream} API"))
            }
            ProxyError::NotFound => envelope::plain_text(status, NOT_FOUND_MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use super::*;

    async fn body_bytes(response: Response<AxumBody>) -> bytes::Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_rate_limited_envelope() {
        let response = ProxyError::RateLimited {
            retry_after_secs: 60,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body, json!({"error": "Rate limit exceeded"}));
    }

    #[tokio::test]
    async fn test_upstream_envelope_forwards_status() {
        let response = ProxyError::Upstream {
            upstream: Upstream::OpenFoodFacts,
            status: StatusCode::NOT_FOUND,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            body,
            json!({"error": "Open Food Facts API error", "status": 404})
        );
    }

    #[tokio::test]
    async fn test_transport_envelope_hides_reason() {
        let response =
            ProxyError::transport(Upstream::Usda, "dns error: no such host").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_bytes(response).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert!(!text.contains("dns"));
        assert!(text.contains("USDA"));
    }

    #[tokio::test]
    async fn test_not_found_is_plain_text() {
        let response = ProxyError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        assert_eq!(&body_bytes(response).await[..], NOT_FOUND_MESSAGE.as_bytes());
    }
}
