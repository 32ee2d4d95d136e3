//! `/off/*` handler: Open Food Facts search and product lookup.
//!
//! Search results are decoded and enriched (see [`super::product`]); product lookups
//! stream the upstream body untouched. Both carry the configured user agent, which
//! Open Food Facts requires from API clients.
use std::{borrow::Cow, sync::Arc};

use axum::body::Body as AxumBody;
use eyre::{Result, eyre};
use http::{Response, StatusCode};
use http_body_util::BodyExt;
use url::Url;

use super::{
    context::RequestContext,
    cors::build_cors,
    envelope::{self, CacheDirective},
    error::{ProxyError, Upstream},
    product::{EnrichedSearchPage, SearchPage},
    rate_gate::{GateLimit, RateGate},
    upstream,
};
use crate::{config::OffConfig, metrics, ports::http_client::HttpClient};

pub const INVALID_ENDPOINT: &str = "Invalid endpoint. Use /off/search or /off/product";
pub const MISSING_QUERY: &str = "Missing ?query parameter";
pub const MISSING_CODE: &str = "Missing product code. Use /off/product/{code} or ?code=";

pub struct OffHandler {
    config: OffConfig,
    limit: GateLimit,
    gate: RateGate,
    client: Arc<dyn HttpClient>,
}

impl OffHandler {
    pub fn new(config: &OffConfig, gate: RateGate, client: Arc<dyn HttpClient>) -> Result<Self> {
        let window = config
            .rate_limit
            .window_duration()
            .map_err(|e| eyre!("off.rate_limit: {e}"))?;
        Ok(Self {
            config: config.clone(),
            limit: GateLimit::new(config.rate_limit.requests, window),
            gate,
            client,
        })
    }

    pub async fn handle(&self, ctx: &RequestContext) -> Result<Response<AxumBody>, ProxyError> {
        if ctx.is_preflight() {
            return Ok(build_cors(None));
        }

        let decision = self.gate.check(ctx.identity(), self.limit).await;
        if !decision.allowed {
            metrics::increment_rate_limited_total(Upstream::OpenFoodFacts.label());
            return Err(ProxyError::RateLimited {
                retry_after_secs: decision.retry_after_secs,
            });
        }

        match ctx.segment(1) {
            Some("search") => self.search(ctx).await,
            Some("product") => self.product(ctx).await,
            _ => Err(ProxyError::validation(INVALID_ENDPOINT)),
        }
    }

    async fn search(&self, ctx: &RequestContext) -> Result<Response<AxumBody>, ProxyError> {
        let query = ctx
            .param("query")
            .ok_or_else(|| ProxyError::validation(MISSING_QUERY))?;

        let url = self.search_url(query, ctx.param("page"))?;
        let response = self.fetch(&url).await?;

        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ProxyError::transport(Upstream::OpenFoodFacts, e))?
            .to_bytes();
        let page: SearchPage = serde_json::from_slice(&bytes)
            .map_err(|e| ProxyError::transport(Upstream::OpenFoodFacts, e))?;

        let enriched = EnrichedSearchPage::from(page);
        tracing::debug!(
            "Enriched {} Open Food Facts products for search",
            enriched.products.len()
        );

        Ok(envelope::with_cache(
            envelope::json(StatusCode::OK, &enriched),
            CacheDirective::shared(self.config.search_cache_max_age_secs),
        ))
    }

    async fn product(&self, ctx: &RequestContext) -> Result<Response<AxumBody>, ProxyError> {
        let code = Self::product_code(ctx).ok_or_else(|| ProxyError::validation(MISSING_CODE))?;

        let url = self.product_url(&code)?;
        let response = self.fetch(&url).await?;

        Ok(envelope::passthrough(
            response.into_body(),
            CacheDirective::shared(self.config.product_cache_max_age_secs),
        ))
    }

    /// Path segment wins over `?code=`.
    fn product_code(ctx: &RequestContext) -> Option<Cow<'_, str>> {
        let from_path = ctx.segment(2).map(|raw| {
            urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
        });

        from_path
            .filter(|code| !code.trim().is_empty())
            .or_else(|| ctx.param("code").map(Cow::Borrowed))
    }

    async fn fetch(&self, url: &Url) -> Result<Response<AxumBody>, ProxyError> {
        upstream::fetch(
            self.client.as_ref(),
            Upstream::OpenFoodFacts,
            url,
            Some(&self.config.user_agent),
        )
        .await
    }

    pub fn search_url(&self, query: &str, page: Option<&str>) -> Result<Url, ProxyError> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/cgi/search.pl"))
            .map_err(|e| ProxyError::transport(Upstream::OpenFoodFacts, e))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("search_terms", query)
                .append_pair("search_simple", "1")
                .append_pair("action", "process")
                .append_pair("json", "1")
                .append_pair("page_size", &self.config.page_size.to_string())
                .append_pair("lc", &self.config.language)
                .append_pair("fields", &self.config.search_fields.join(","));
            if let Some(page) = page {
                pairs.append_pair("page", page);
            }
        }

        Ok(url)
    }

    pub fn product_url(&self, code: &str) -> Result<Url, ProxyError> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!(
            "{base}/api/v2/product/{}.json",
            urlencoding::encode(code.trim())
        ))
        .map_err(|e| ProxyError::transport(Upstream::OpenFoodFacts, e))?;

        url.query_pairs_mut()
            .append_pair("lc", &self.config.language)
            .append_pair("fields", &self.config.product_fields.join(","));

        Ok(url)
    }
}
