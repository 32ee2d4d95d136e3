//! In-process counter store.
//!
//! Stands in for an edge key-value store: values carry an absolute expiry and read as
//! absent once it has passed. Expiry uses `tokio::time::Instant` so that tests can drive
//! the clock with `tokio::time::advance`.
use std::time::Duration;

use async_trait::async_trait;
use scc::HashMap;
use tokio::time::Instant;

use crate::ports::counter_store::{CounterStore, CounterStoreResult};

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    value: u64,
    expires_at: Instant,
}

impl CounterEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Default)]
pub struct MemoryCounterStore {
    entries: HashMap<String, CounterEntry>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired counter, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain_async(|_, entry| entry.is_live(now))
            .await;
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!("Purged {} expired rate-limit counters", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> CounterStoreResult<Option<u64>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get_async(key)
            .await
            .map(|entry| *entry.get())
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: u64, ttl: Duration) -> CounterStoreResult<()> {
        let entry = CounterEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .entry_async(key.to_string())
            .await
            .and_modify(|existing| *existing = entry)
            .or_insert(entry);
        Ok(())
    }
}
