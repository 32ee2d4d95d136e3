pub mod context;
pub mod cors;
pub mod envelope;
pub mod error;
pub mod off;
pub mod product;
pub mod rate_gate;
pub mod router;
mod upstream;
pub mod usda;

pub use context::RequestContext;
pub use error::{ProxyError, Upstream};
pub use rate_gate::{GateDecision, GateLimit, RateGate};
pub use router::ProxyService;
