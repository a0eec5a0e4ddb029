//! Time-to-live memoization of upstream response bodies.
//!
//! Entries are keyed by request URL and expire after a fixed wall-clock interval.
//! There is no write path upstream, so nothing is ever invalidated early.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a single fetch interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a live entry when present, otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then overwrite the stored entry.
    Refresh,
    /// Always fetch; never read or write.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

/// Hit/miss counters since the store was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Shared TTL cache. Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct CacheStore {
    entries: Arc<tokio::sync::RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A store that never retains anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    /// Returns the live body for `key` when `mode` allows reads. Counts a hit or a miss.
    pub async fn lookup(&self, key: &str, mode: CacheMode) -> Option<String> {
        if !mode.reads() || self.is_disabled() {
            return None;
        }

        let found = {
            let entries = self.entries.read().await;
            entries
                .get(key)
                .filter(|entry| Instant::now() < entry.expires_at)
                .map(|entry| entry.body.clone())
        };

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Stores `body` under `key` when `mode` allows writes.
    pub async fn store(&self, key: &str, body: &str, mode: CacheMode) {
        if !mode.writes() || self.is_disabled() {
            return;
        }

        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_owned(),
            CacheEntry {
                body: body.to_owned(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drops expired entries.
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.expires_at > now);
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
