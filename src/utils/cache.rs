use crate::logic::types::PoolHandle;
use alloy_primitives::Address;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cached value with its insertion time
#[derive(Clone, Debug)]
pub struct CacheItem<T> {
    pub data: T,
    pub timestamp: Instant,
    pub ttl: Duration,
}

impl<T> CacheItem<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self { data, timestamp: Instant::now(), ttl }
    }

    pub fn is_expired(&self) -> bool {
        self.timestamp.elapsed() > self.ttl
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}

/// Key order independent of the caller's token order.
pub type PairKey = (Address, Address, Address);

pub fn pair_key(factory: Address, token_a: Address, token_b: Address) -> PairKey {
    if token_a <= token_b { (factory, token_a, token_b) } else { (factory, token_b, token_a) }
}

/// Entry count past which an insert first sweeps expired entries.
pub const DEFAULT_SWEEP_THRESHOLD: usize = 4_096;

/// Pool existence cache: `(factory, pair) -> Some(pool) | None (no pool)`.
///
/// Only pool identity lives here. Reserves are never cached.
#[derive(Debug)]
pub struct PoolCache {
    pools: DashMap<PairKey, CacheItem<Option<PoolHandle>>>,
    pub stats: CacheStats,
    ttl: Duration,
    sweep_threshold: usize,
}

impl PoolCache {
    pub fn new(ttl: Duration) -> Self {
        Self { pools: DashMap::new(), stats: CacheStats::default(), ttl, sweep_threshold: DEFAULT_SWEEP_THRESHOLD }
    }

    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold;
        self
    }

    /// Outer `None` is a miss, inner `None` a cached "no pool".
    pub fn get(&self, factory: Address, token_a: Address, token_b: Address) -> Option<Option<PoolHandle>> {
        let key = pair_key(factory, token_a, token_b);
        if let Some(item) = self.pools.get(&key) {
            if !item.is_expired() {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(item.data.clone());
            }
        }
        if self.pools.remove_if(&key, |_, item| item.is_expired()).is_some() {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, factory: Address, token_a: Address, token_b: Address, pool: Option<PoolHandle>) {
        if self.pools.len() >= self.sweep_threshold {
            self.cleanup_expired();
        }
        self.pools.insert(pair_key(factory, token_a, token_b), CacheItem::new(pool, self.ttl));
    }

    pub fn invalidate(&self, factory: Address, token_a: Address, token_b: Address) {
        self.pools.remove(&pair_key(factory, token_a, token_b));
    }

    pub fn invalidate_factory(&self, factory: Address) {
        self.pools.retain(|(key_factory, _, _), _| *key_factory != factory);
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.pools.len();
        self.pools.retain(|_, item| !item.is_expired());
        let evicted = before.saturating_sub(self.pools.len());
        self.stats.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        evicted
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn clear(&self) {
        self.pools.clear();
    }
}
