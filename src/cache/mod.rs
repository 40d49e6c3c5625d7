//! In-memory TTL cache of normalized item records.
//!
//! Entries expire `ttl` after they were written. Expired entries are treated
//! as absent immediately and are dropped either lazily, on the next read of
//! their key, or by the optional background sweep.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::item::{ItemRecord, LookupKey};

#[derive(Debug, Clone)]
struct CacheEntry {
    record: ItemRecord,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

/// Shared item cache.
///
/// Backed by a sharded concurrent map, so lookups for different keys do not
/// contend and no lock is ever held across an `.await`. Writers to the same
/// key race with last-writer-wins semantics.
///
/// Time comes from [`tokio::time::Instant`]; under a paused test runtime the
/// clock only moves when the test advances it.
#[derive(Debug)]
pub struct ItemCache {
    entries: DashMap<LookupKey, CacheEntry>,
    default_ttl: Duration,
}

impl ItemCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// TTL applied by the lookup handler.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the record for `key` if present and not yet expired.
    pub fn get(&self, key: &LookupKey) -> Option<ItemRecord> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(entry.record.clone()),
            Some(_) => {}
        }

        // The read guard is gone; a fresh `set` may have landed in between,
        // so only remove what is still expired.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            debug!(%key, "evicted expired entry on read");
        }
        None
    }

    /// Stores `record` under `key`, replacing any previous entry and
    /// restarting its TTL.
    pub fn set(&self, key: LookupKey, record: ItemRecord, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                record,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spawns a task that calls [`purge_expired`](Self::purge_expired) every
    /// `every`. Abort the returned handle to stop it.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = self.len(), "cache sweep");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    fn key(barcode: &str) -> LookupKey {
        LookupKey::new("LARIA", barcode).unwrap()
    }

    fn record(code: &str, qty: f64) -> ItemRecord {
        ItemRecord {
            item_code: code.to_owned(),
            item_name: "Widget".to_owned(),
            qty_on_stock: qty,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn get_returns_fresh_entry() {
        let cache = ItemCache::new(TTL);
        cache.set(key("1"), record("X1", 5.0), TTL);
        assert_eq!(cache.get(&key("1")), Some(record("X1", 5.0)));
        assert_eq!(cache.get(&key("2")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_exactly_at_ttl() {
        let cache = ItemCache::new(TTL);
        cache.set(key("1"), record("X1", 5.0), TTL);

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert!(cache.get(&key("1")).is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get(&key("1")).is_none());
        // Lazily evicted by the read above.
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_resets_ttl() {
        let cache = ItemCache::new(TTL);
        cache.set(key("1"), record("X1", 5.0), TTL);
        tokio::time::advance(Duration::from_secs(200)).await;

        cache.set(key("1"), record("X1", 7.0), TTL);
        tokio::time::advance(Duration::from_secs(200)).await;

        assert_eq!(cache.get(&key("1")), Some(record("X1", 7.0)));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn per_entry_ttl_is_honoured() {
        let cache = ItemCache::new(TTL);
        cache.set(key("short"), record("S", 1.0), Duration::from_secs(1));
        cache.set(key("long"), record("L", 1.0), TTL);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&key("short")).is_none());
        assert!(cache.get(&key("long")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired() {
        let cache = ItemCache::new(TTL);
        cache.set(key("old"), record("O", 1.0), Duration::from_secs(10));
        cache.set(key("new"), record("N", 1.0), TTL);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("new")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_in_background() {
        let cache = Arc::new(ItemCache::new(TTL));
        cache.set(key("1"), record("X1", 1.0), Duration::from_secs(5));
        let sweeper = Arc::clone(&cache).spawn_sweeper(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(cache.is_empty());
        sweeper.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_do_not_corrupt() {
        let cache = Arc::new(ItemCache::new(TTL));
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64 {
            let cache = Arc::clone(&cache);
            tasks.spawn(async move {
                let barcode = (i % 8).to_string();
                cache.set(key(&barcode), record(&barcode, i as f64), TTL);
                cache.get(&key(&barcode))
            });
        }
        while let Some(result) = tasks.join_next().await {
            let seen = result.unwrap().expect("entry written just before read");
            assert_eq!(seen.item_name, "Widget");
        }
        assert_eq!(cache.len(), 8);
    }
}
