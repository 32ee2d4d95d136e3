use std::{convert::Infallible, sync::Arc};

use axum::{
    Router,
    body::Body as AxumBody,
    extract::Request,
    middleware,
    routing::any,
};
use eyre::{Result, WrapErr};
use http::{HeaderName, Response};
use tower_http::compression::CompressionLayer;
use tracing::Instrument;

use super::middleware::{
    RequestId, request_id_middleware, request_timing_middleware, security_headers_middleware,
};
use crate::{
    config::ProxyConfig,
    core::{ProxyService, RequestContext},
    metrics, tracing_setup,
};

/// HTTP entry point: turns an axum request into a [`RequestContext`] and hands it to
/// the proxy service.
#[derive(Clone)]
pub struct HttpHandler {
    service: Arc<ProxyService>,
    identity_header: HeaderName,
}

impl HttpHandler {
    pub fn new(service: Arc<ProxyService>, config: &ProxyConfig) -> Result<Self> {
        let identity_header = HeaderName::from_bytes(config.client_ip_header.as_bytes())
            .wrap_err_with(|| {
                format!("Invalid client_ip_header: {}", config.client_ip_header)
            })?;

        Ok(Self {
            service,
            identity_header,
        })
    }

    pub async fn handle_request(&self, req: Request) -> Response<AxumBody> {
        let (parts, _body) = req.into_parts();
        let ctx = RequestContext::from_request(&parts, &self.identity_header);

        let route = metrics::route_label(ctx.path());
        let method = ctx.method().to_string();
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        let span = tracing_setup::create_request_span(&method, route, &request_id);
        let _timer = metrics::RequestTimer::new(route, &method);

        let response = self
            .service
            .dispatch(ctx)
            .instrument(span.clone())
            .await;

        let status = response.status().as_u16();
        span.record("http.status_code", status);
        metrics::increment_request_total(route, &method, status);

        response
    }
}

/// Build the axum application: every path funnels into [`HttpHandler`].
pub fn router(handler: Arc<HttpHandler>) -> Router {
    let make_request_route = |handler: Arc<HttpHandler>| {
        any(move |req: Request| {
            let handler = handler.clone();
            async move { Ok::<_, Infallible>(handler.handle_request(req).await) }
        })
    };

    Router::new()
        .route("/", make_request_route(handler.clone()))
        .route("/{*path}", make_request_route(handler))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_timing_middleware))
        .layer(middleware::from_fn(request_id_middleware))
}
