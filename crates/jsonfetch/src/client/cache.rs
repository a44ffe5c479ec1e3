//! In-memory response cache with a fixed freshness lifetime.
//!
//! Entries are keyed by `METHOD:url` and hold the decoded JSON body together
//! with the time it was stored. Staleness is checked on lookup and stale
//! entries are dropped then; nothing sweeps the store in the background and
//! there is no size bound.
//!
//! Lookups and stores are not coordinated across concurrent calls: two misses
//! on one key both dispatch and the last store wins. Dropping a stale entry
//! only removes the exact entry that was found stale, so a fresh value stored
//! by a concurrent call in the meantime survives.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use moka::ops::compute::Op;
use serde_json::Value;

/// A cached response body.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Decoded response body.
    pub body: Value,
    /// Epoch milliseconds when the entry was stored.
    pub inserted_at: i64,
}

impl CacheEntry {
    /// An entry is stale once `lifetime` has fully elapsed since it was stored.
    #[must_use]
    pub fn is_stale(&self, now: i64, lifetime: Duration) -> bool {
        let age = i128::from(now) - i128::from(self.inserted_at);
        age >= i128::from(duration_millis(lifetime))
    }
}

/// Response cache shared by all handles of one client.
pub struct ResponseCache {
    entries: Cache<String, CacheEntry>,
    lifetime_ms: AtomicU64,
}

impl ResponseCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        // No capacity and no TTL: moka keeps everything until we invalidate it.
        Self {
            entries: Cache::builder().build(),
            lifetime_ms: AtomicU64::new(duration_millis(lifetime)),
        }
    }

    /// Current freshness lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms.load(Ordering::Relaxed))
    }

    /// Change the freshness lifetime; applies to existing entries too.
    pub fn set_lifetime(&self, lifetime: Duration) {
        self.lifetime_ms.store(duration_millis(lifetime), Ordering::Relaxed);
    }

    /// Fresh body stored under `key` as of `now`, removing it if stale.
    pub async fn lookup_at(&self, key: &str, now: i64) -> Option<Value> {
        let entry = self.entries.get(key).await?;
        if entry.is_stale(now, self.lifetime()) {
            self.remove_if_unchanged(key, entry.inserted_at).await;
            return None;
        }
        Some(entry.body)
    }

    /// Store `body` under `key` as of `now`.
    pub async fn store_at(&self, key: String, body: Value, now: i64) {
        self.entries.insert(key, CacheEntry { body, inserted_at: now }).await;
    }

    /// Raw entry, fresh or not.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).await
    }

    /// Remove `key` only if it still holds the entry stored at `inserted_at`.
    async fn remove_if_unchanged(&self, key: &str, inserted_at: i64) {
        let _ = self
            .entries
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(found) if found.value().inserted_at == inserted_at => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache").field("lifetime", &self.lifetime()).finish_non_exhaustive()
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
