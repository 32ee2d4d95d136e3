//! Port for the external key-value store holding rate-limit counters.
//!
//! The rate gate only needs two capabilities: read a counter and write a counter
//! with an expiry. Stores may suspend on I/O, and the pair of calls is not atomic.
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CounterStoreError {
    /// The store could not be reached or refused the operation
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),
}

pub type CounterStoreResult<T> = Result<T, CounterStoreError>;

#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Current value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> CounterStoreResult<Option<u64>>;

    /// Overwrite `key` with `value`, expiring `ttl` from now.
    async fn put(&self, key: &str, value: u64, ttl: Duration) -> CounterStoreResult<()>;
}
