//! Per-request view of an inbound call.
//!
//! A [`RequestContext`] is built once at the edge of the service and never mutated;
//! the legacy root-path rewrite produces a fresh context instead.
use std::collections::HashMap;

use http::{HeaderName, Method, request::Parts};

/// Identity used when the trusted forwarded-IP header is absent.
pub const UNKNOWN_IDENTITY: &str = "unknown";

#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    raw_query: Option<String>,
    params: HashMap<String, String>,
    identity: String,
}

impl RequestContext {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        raw_query: Option<&str>,
        identity: impl Into<String>,
    ) -> Self {
        let raw_query = raw_query.map(str::to_string);
        let mut params = HashMap::new();
        if let Some(query) = raw_query.as_deref() {
            // First occurrence wins, matching URLSearchParams::get.
            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params
                    .entry(name.into_owned())
                    .or_insert_with(|| value.into_owned());
            }
        }

        Self {
            method,
            path: path.into(),
            raw_query,
            params,
            identity: identity.into(),
        }
    }

    /// Build a context from request parts, reading the caller identity from the
    /// single trusted header.
    pub fn from_request(parts: &Parts, identity_header: &HeaderName) -> Self {
        let identity = parts
            .headers
            .get(identity_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_IDENTITY);

        Self::new(
            parts.method.clone(),
            parts.uri.path(),
            parts.uri.query(),
            identity,
        )
    }

    /// Same request addressed to another path; query and identity are kept verbatim.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            method: self.method.clone(),
            path: path.into(),
            raw_query: self.raw_query.clone(),
            params: self.params.clone(),
            identity: self.identity.clone(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_preflight(&self) -> bool {
        self.method == Method::OPTIONS
    }

    /// Non-empty path segments, e.g. `["off", "product", "123"]`.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Path segment at `index`, if any.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments().get(index).copied()
    }

    /// Query parameter value; an empty value counts as missing.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}
