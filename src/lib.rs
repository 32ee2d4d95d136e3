//! NutriGate - an edge reverse proxy for food data APIs.
//!
//! NutriGate fronts two public nutrition APIs, USDA FoodData Central and Open Food
//! Facts, behind one small HTTP surface. It hides the USDA API key, applies per-client
//! fixed-window rate limits, normalizes error envelopes, sets CORS and shared-cache
//! headers, and enriches Open Food Facts search results with derived fields.
//!
//! # Endpoints
//! - `GET /usda/search?query=..[&pageNumber=..]` - USDA food search (Foundation foods)
//! - `GET /off/search?query=..[&page=..]` - Open Food Facts search, enriched
//! - `GET /off/product/{code}` or `/off/product?code=..` - Open Food Facts product
//! - `GET /?query=..` - legacy alias of `/usda/search`
//! - `OPTIONS` on any upstream path - CORS preflight
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use nutrigate::{
//!     HttpClient, HttpClientAdapter, HttpHandler, MemoryCounterStore, ProxyService,
//!     adapters::router, ports::counter_store::CounterStore,
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = Arc::new(nutrigate::config::load_config("nutrigate.toml").await?);
//! let client: Arc<dyn HttpClient> = Arc::new(HttpClientAdapter::new()?);
//! let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
//! let service = Arc::new(ProxyService::new(config.clone(), client, Some(store))?);
//! let app = router(Arc::new(HttpHandler::new(service, &config)?));
//! # let _ = app;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! the request decisions inside `core`. The core never performs I/O directly: the upstream
//! HTTP client and the rate-limit counter store are injected behind traits.
//!
//! # Error Handling
//! Startup paths return `eyre::Result<T>`. Per-request failures are a `thiserror` enum,
//! [`ProxyError`], that maps one-to-one onto JSON or plain-text error envelopes.
//!
//! # Concurrency & Data Structures
//! The in-memory counter store uses `scc::HashMap`. The rate gate reads then writes
//! without a lock, so bursts from one client can slightly exceed the limit.
// Re-export public modules with explicit visibility controls
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{HttpClientAdapter, HttpHandler, MemoryCounterStore},
    core::{ProxyError, ProxyService, RequestContext},
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
