//! `/usda/*` handler: FoodData Central food search.
use std::sync::Arc;

use axum::body::Body as AxumBody;
use eyre::{Result, eyre};
use http::Response;
use url::Url;

use super::{
    context::RequestContext,
    cors::build_cors,
    envelope::{self, CacheDirective},
    error::{ProxyError, Upstream},
    rate_gate::{GateLimit, RateGate},
    router::USDA_PREFIX,
    upstream,
};
use crate::{config::UsdaConfig, metrics, ports::http_client::HttpClient};

pub const INVALID_ENDPOINT: &str = "Invalid endpoint. Use /usda/search";
pub const MISSING_QUERY: &str = "Missing ?query parameter";

pub struct UsdaHandler {
    config: UsdaConfig,
    limit: GateLimit,
    gate: RateGate,
    client: Arc<dyn HttpClient>,
}

impl UsdaHandler {
    pub fn new(config: &UsdaConfig, gate: RateGate, client: Arc<dyn HttpClient>) -> Result<Self> {
        let window = config
            .rate_limit
            .window_duration()
            .map_err(|e| eyre!("usda.rate_limit: {e}"))?;
        Ok(Self {
            config: config.clone(),
            limit: GateLimit::new(config.rate_limit.requests, window),
            gate,
            client,
        })
    }

    /// OPTIONS short-circuit, then rate gate, then sub-path and query validation.
    pub async fn handle(&self, ctx: &RequestContext) -> Result<Response<AxumBody>, ProxyError> {
        if ctx.is_preflight() {
            return Ok(build_cors(None));
        }

        let decision = self.gate.check(ctx.identity(), self.limit).await;
        if !decision.allowed {
            metrics::increment_rate_limited_total(Upstream::Usda.label());
            return Err(ProxyError::RateLimited {
                retry_after_secs: decision.retry_after_secs,
            });
        }

        // Exact match: no trailing slash, no extra or empty segments.
        if ctx.path().strip_prefix(USDA_PREFIX) != Some("search") {
            return Err(ProxyError::validation(INVALID_ENDPOINT));
        }

        let query = ctx
            .param("query")
            .ok_or_else(|| ProxyError::validation(MISSING_QUERY))?;

        let url = self.search_url(query, ctx.param("pageNumber"))?;
        let response = upstream::fetch(self.client.as_ref(), Upstream::Usda, &url, None).await?;

        Ok(envelope::passthrough(
            response.into_body(),
            CacheDirective::shared(self.config.cache_max_age_secs),
        ))
    }

    /// `{base}/foods/search` restricted to the configured data type and page size.
    pub fn search_url(&self, query: &str, page_number: Option<&str>) -> Result<Url, ProxyError> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/foods/search"))
            .map_err(|e| ProxyError::transport(Upstream::Usda, e))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", query)
                .append_pair("dataType", &self.config.data_type)
                .append_pair("pageSize", &self.config.page_size.to_string());
            if let Some(page) = page_number {
                pairs.append_pair("pageNumber", page);
            }
            pairs.append_pair("api_key", &self.config.api_key);
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use http::Request;

    use super::*;
    use crate::ports::http_client::{HttpClientError, HttpClientResult};

    struct Unreachable;

    #[async_trait]
    impl HttpClient for Unreachable {
        async fn send_request(
            &self,
            _req: Request<AxumBody>,
        ) -> HttpClientResult<Response<AxumBody>> {
            Err(HttpClientError::ConnectionError("unreachable".to_string()))
        }
    }

    fn handler() -> UsdaHandler {
        let config = UsdaConfig {
            api_key: "KEY".to_string(),
            ..UsdaConfig::default()
        };
        UsdaHandler::new(&config, RateGate::new(None), Arc::new(Unreachable)).unwrap()
    }

    #[test]
    fn test_search_url_shape() {
        let url = handler().search_url("cheddar cheese", None).unwrap();
        assert_eq!(url.path(), "/fdc/v1/foods/search");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("query".to_string(), "cheddar cheese".to_string())));
        assert!(pairs.contains(&("dataType".to_string(), "Foundation".to_string())));
        assert!(pairs.contains(&("pageSize".to_string(), "20".to_string())));
        assert!(pairs.contains(&("api_key".to_string(), "KEY".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "pageNumber"));
    }

    #[test]
    fn test_search_url_forwards_page_number() {
        let url = handler().search_url("rice", Some("3")).unwrap();
        assert!(url.query_pairs().any(|(k, v)| k == "pageNumber" && v == "3"));
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_500() {
        let ctx = RequestContext::new(http::Method::GET, "/usda/search", Some("query=oats"), "ip");
        let err = handler().handle(&ctx).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_sub_path_must_be_exactly_search() {
        for path in ["/usda/search/extra", "/usda//search", "/usda/search/", "/usda/Search"] {
            let ctx = RequestContext::new(http::Method::GET, path, Some("query=oats"), "ip");
            let err = handler().handle(&ctx).await.unwrap_err();
            assert_eq!(err.to_string(), INVALID_ENDPOINT, "{path}");
        }
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        let mut config = UsdaConfig::default();
        config.rate_limit.window = "whenever".to_string();
        assert!(UsdaHandler::new(&config, RateGate::new(None), Arc::new(Unreachable)).is_err());
    }
}
