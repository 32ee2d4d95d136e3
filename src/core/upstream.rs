use axum::body::Body as AxumBody;
use http::{Method, Request, Response, header};
use tracing::Instrument;
use url::Url;

use super::error::{ProxyError, Upstream};
use crate::{metrics, ports::http_client::HttpClient, tracing_setup};

/// Issue a GET to `url` and hand back the response only if it is a success.
///
/// The query string is never logged: for USDA it carries the API key.
pub(crate) async fn fetch(
    client: &dyn HttpClient,
    upstream: Upstream,
    url: &Url,
    user_agent: Option<&str>,
) -> Result<Response<AxumBody>, ProxyError> {
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(url.as_str())
        .header(header::ACCEPT, "application/json");
    if let Some(user_agent) = user_agent {
        builder = builder.header(header::USER_AGENT, user_agent);
    }
    let request = builder
        .body(AxumBody::empty())
        .map_err(|e| ProxyError::transport(upstream, e))?;

    let span = tracing_setup::create_upstream_span(upstream.label(), url.path());
    let _timer = metrics::UpstreamRequestTimer::new(upstream.label());
    let response = match client.send_request(request).instrument(span.clone()).await {
        Ok(response) => response,
        Err(e) => {
            metrics::increment_upstream_request_total(upstream.label(), 0);
            return Err(ProxyError::transport(upstream, e));
        }
    };

    let status = response.status();
    span.record("http.status_code", status.as_u16());
    metrics::increment_upstream_request_total(upstream.label(), status.as_u16());

    if !status.is_success() {
        tracing::warn!("{} upstream answered {} for {}", upstream, status, url.path());
        return Err(ProxyError::Upstream { upstream, status });
    }

    Ok(response)
}
