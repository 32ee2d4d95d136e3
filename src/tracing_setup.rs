use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Initialize logging from configuration. `RUST_LOG`, when set, overrides the
/// configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(&config.level)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if config.json {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.json().with_current_span(false).with_span_list(true))
            .try_init()
            .wrap_err("Failed to install JSON tracing subscriber")?;
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.pretty().with_ansi(true))
            .try_init()
            .wrap_err("Failed to install console tracing subscriber")?;
    }

    tracing::info!(
        "NutriGate logging initialized (level: {}, json: {})",
        config.level,
        config.json
    );
    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("Invalid log level: {level}")),
    }
}

/// Create a request-scoped tracing span
pub fn create_request_span(method: &str, route: &str, request_id: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        http.method = method,
        http.route = route,
        request.id = request_id,
        http.status_code = tracing::field::Empty,
        duration_ms = tracing::field::Empty,
    )
}

/// Span around a single upstream call. Only the path is recorded; query strings may
/// carry credentials.
pub fn create_upstream_span(upstream: &str, path: &str) -> tracing::Span {
    tracing::info_span!(
        "upstream_request",
        upstream = upstream,
        http.path = path,
        http.status_code = tracing::field::Empty,
    )
}
