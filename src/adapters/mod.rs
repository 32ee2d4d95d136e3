pub mod http_client;
pub mod http_handler;
pub mod memory_store;
pub mod middleware;

/// Re-export commonly used types from adapters
pub use http_client::HttpClientAdapter;
pub use http_handler::{HttpHandler, router};
pub use memory_store::MemoryCounterStore;
pub use middleware::*;
