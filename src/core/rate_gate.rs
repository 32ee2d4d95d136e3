//! Fixed-window rate gate backed by an external counter store.
//!
//! Each caller identity owns one counter under `rl:<identity>` whose TTL equals the
//! window. The counter is created on the first admitted hit and rewritten on every
//! later admitted hit; the window closes when the store expires the key.
//!
//! Two properties are relaxed on purpose and must stay that way unless the store grows
//! an atomic increment:
//! * a burst straddling a window boundary can admit up to `2 × limit` requests;
//! * the read and the write are separate store calls, so concurrent requests from one
//!   identity may observe the same count and both be admitted.
use std::{sync::Arc, time::Duration};

use crate::ports::counter_store::CounterStore;

pub const KEY_PREFIX: &str = "rl:";

/// Outcome of a single gate check. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    pub retry_after_secs: u64,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_secs: 0,
        }
    }

    pub fn reject(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs,
        }
    }
}

/// Quota applied by a handler: `requests` hits per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLimit {
    pub requests: u64,
    pub window: Duration,
}

impl GateLimit {
    pub fn new(requests: u64, window: Duration) -> Self {
        Self { requests, window }
    }
}

#[derive(Clone, Default)]
pub struct RateGate {
    store: Option<Arc<dyn CounterStore>>,
}

impl RateGate {
    /// A gate without a store admits everything.
    pub fn new(store: Option<Arc<dyn CounterStore>>) -> Self {
        if store.is_none() {
            tracing::warn!("No counter store bound; rate limiting is disabled");
        }
        Self { store }
    }

    pub fn is_enforcing(&self) -> bool {
        self.store.is_some()
    }

    pub fn key_for(identity: &str) -> String {
        format!("{KEY_PREFIX}{identity}")
    }

    /// Admit or reject one hit for `identity`. Only admitted hits touch the store.
    pub async fn check(&self, identity: &str, limit: GateLimit) -> GateDecision {
        let Some(store) = &self.store else {
            return GateDecision::allow();
        };

        let key = Self::key_for(identity);
        // Rounded up so a client never retries before the key expires.
        let window_secs = limit.window.as_secs() + u64::from(limit.window.subsec_nanos() > 0);

        let count = match store.get(&key).await {
            Ok(count) => count.unwrap_or(0),
            Err(e) => {
                tracing::warn!(key = %key, "Counter store read failed, admitting request: {}", e);
                return GateDecision::allow();
            }
        };

        if count >= limit.requests {
            tracing::info!(
                identity = %identity,
                count,
                limit = limit.requests,
                "Rate limit exceeded"
            );
            return GateDecision::reject(window_secs);
        }

        if let Err(e) = store.put(&key, count + 1, limit.window).await {
            tracing::warn!(key = %key, "Counter store write failed, admitting request: {}", e);
        }

        GateDecision::allow()
    }
}
