//! Top-level dispatch.
//!
//! Routing happens in two pure steps before any handler runs: the legacy
//! `/?query=...` form is rewritten to `/usda/search`, then the path prefix selects a
//! handler. [`ProxyService::dispatch`] never fails; every error becomes an envelope.
use std::sync::Arc;

use axum::body::Body as AxumBody;
use eyre::Result;
use http::Response;

use super::{
    context::RequestContext,
    error::ProxyError,
    off::OffHandler,
    rate_gate::RateGate,
    usda::UsdaHandler,
};
use crate::{
    config::ProxyConfig,
    ports::{counter_store::CounterStore, http_client::HttpClient},
};

pub const USDA_PREFIX: &str = "/usda/";
pub const OFF_PREFIX: &str = "/off/";
pub const USDA_SEARCH_PATH: &str = "/usda/search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Usda,
    Off,
    NotFound,
}

/// Backward compatibility: `/` carrying a non-empty `query` is a USDA search.
pub fn rewrite_legacy(ctx: RequestContext) -> RequestContext {
    if ctx.path() == "/" && ctx.param("query").is_some() {
        tracing::debug!("Rewriting legacy root request to {}", USDA_SEARCH_PATH);
        ctx.with_path(USDA_SEARCH_PATH)
    } else {
        ctx
    }
}

pub fn resolve(ctx: &RequestContext) -> Route {
    let path = ctx.path();
    if path.starts_with(USDA_PREFIX) {
        Route::Usda
    } else if path.starts_with(OFF_PREFIX) {
        Route::Off
    } else {
        Route::NotFound
    }
}

/// Owns both handlers and the rate gate they share.
pub struct ProxyService {
    usda: UsdaHandler,
    off: OffHandler,
    gate: RateGate,
}

impl ProxyService {
    pub fn new(
        config: Arc<ProxyConfig>,
        client: Arc<dyn HttpClient>,
        store: Option<Arc<dyn CounterStore>>,
    ) -> Result<Self> {
        let gate = RateGate::new(store);
        Ok(Self {
            usda: UsdaHandler::new(&config.usda, gate.clone(), client.clone())?,
            off: OffHandler::new(&config.off, gate.clone(), client)?,
            gate,
        })
    }

    pub fn rate_limiting_enabled(&self) -> bool {
        self.gate.is_enforcing()
    }

    pub async fn dispatch(&self, ctx: RequestContext) -> Response<AxumBody> {
        let ctx = rewrite_legacy(ctx);

        let result = match resolve(&ctx) {
            Route::Usda => self.usda.handle(&ctx).await,
            Route::Off => self.off.handle(&ctx).await,
            Route::NotFound => Err(ProxyError::NotFound),
        };

        result.unwrap_or_else(|err| {
            match &err {
                ProxyError::Transport { .. } => {
                    tracing::error!(path = %ctx.path(), "{}", err)
                }
                ProxyError::Upstream { .. } => tracing::warn!(path = %ctx.path(), "{}", err),
                _ => tracing::debug!(path = %ctx.path(), "{}", err),
            }
            err.into_response()
        })
    }
}
