use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use hyper::{Request, Response, Version, header};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;

use crate::ports::http_client::{HttpClient, HttpClientError, HttpClientResult};

pub const DEFAULT_USER_AGENT: &str = "NutriGate/0.1";

/// HTTP client adapter using Hyper with Rustls.
///
/// Responsibilities:
/// * Adds default `User-Agent` and `Accept` headers when the caller set none
/// * Forces request version to HTTP/1.1
/// * Records the upstream status on the caller's span
///
/// No timeout is imposed; upstream latency is whatever the upstream gives us.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
}

impl HttpClientAdapter {
    pub fn new() -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        for cert in native_certs.certs {
            if root_cert_store.add(cert).is_err() {
                tracing::warn!("Failed to add native certificate to rustls RootCertStore");
            }
        }
        tracing::info!("Loaded {} native root certificates.", root_cert_store.len());

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        Ok(Self { client })
    }

    /// Inject a consistent set of headers if absent.
    fn add_common_headers(req: &mut Request<AxumBody>) {
        let headers = req.headers_mut();
        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(
                header::USER_AGENT,
                header::HeaderValue::from_static(DEFAULT_USER_AGENT),
            );
        }
        if !headers.contains_key(header::ACCEPT) {
            headers.insert(
                header::ACCEPT,
                header::HeaderValue::from_static("application/json"),
            );
        }
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
    ) -> HttpClientResult<Response<AxumBody>> {
        Self::add_common_headers(&mut req);

        let Some(host) = req.uri().host().map(str::to_owned) else {
            tracing::error!("Outgoing URI has no host");
            return Err(HttpClientError::InvalidRequest(
                "Outgoing URI has no host".to_string(),
            ));
        };

        let (mut parts, body) = req.into_parts();
        parts.version = Version::HTTP_11;

        // Never log the query; it may hold an API key.
        tracing::debug!("Sending request: {} {}{}", parts.method, host, parts.uri.path());

        let outgoing_request = Request::from_parts(parts, body);

        match self.client.request(outgoing_request).await {
            Ok(response) => {
                tracing::Span::current().record("http.status_code", response.status().as_u16());

                let (mut parts, hyper_body) = response.into_parts();
                // The body is re-framed downstream.
                parts.headers.remove(header::TRANSFER_ENCODING);

                Ok(Response::from_parts(parts, AxumBody::new(hyper_body)))
            }
            Err(e) => {
                tracing::error!("Error making request to upstream {}: {}", host, e);
                Err(HttpClientError::ConnectionError(format!(
                    "Request to {host} failed: {e}"
                )))
            }
        }
    }
}
