//! Time-based memoization of aggregation results

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::models::GridBounds;

/// Cache key for one aggregation: the grid and its zoom level
pub type GridKey = (GridBounds, u8);

struct CacheEntry<V> {
    value: Arc<V>,
    created_at: Instant,
}

/// Values computed per key, reused until `ttl` has elapsed.
///
/// Entries expire by age only and are evicted on the next insert. The lock is held while computing, so
/// concurrent callers for an expired key wait for one computation instead
/// of starting their own.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key` if still fresh, otherwise run
    /// `compute` and store its result.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Arc<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(&key) {
            let age = entry.created_at.elapsed();
            if age < self.ttl {
                debug!("Cache hit, entry age {:?}", age);
                return Arc::clone(&entry.value);
            }
            info!("Cache entry expired after {:?}, recomputing", age);
        }

        let value = Arc::new(compute().await);
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.created_at.elapsed() < ttl);
        entries.insert(
            key,
            CacheEntry {
                value: Arc::clone(&value),
                created_at: Instant::now(),
            },
        );
        value
    }

    /// Age of the entry for `key`, if present
    pub async fn age(&self, key: &K) -> Option<Duration> {
        let entries = self.entries.lock().await;
        entries.get(key).map(|entry| entry.created_at.elapsed())
    }
}
