//! The predictive cache store (§4.5): lookup, single-flight miss handling,
//! and capacity-bounded eviction.

use bytes::Bytes;
use dashmap::DashMap;
use gw_types::Clock;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::aggressive::{LatencyTracker, TTL_MULTIPLIER};
use crate::entry::CacheEntry;
use crate::key::cache_key;
use crate::singleflight::{FlightResult, SingleFlightGroup};
use crate::ttl::TtlModel;

pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    ttl_model: TtlModel,
    single_flight: SingleFlightGroup,
    latency: LatencyTracker,
    clock: Arc<dyn Clock>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

pub enum Lookup {
    Hit(Bytes),
    Miss,
}

impl CacheStore {
    pub fn new(clock: Arc<dyn Clock>, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_model: TtlModel::new(),
            single_flight: SingleFlightGroup::new(),
            latency: LatencyTracker::new(),
            clock,
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn key_for(&self, chain: &str, method: &str, params: &Value) -> String {
        cache_key(chain, method, params)
    }

    /// Look up a key without populating on miss. On any internal error,
    /// treat it as a miss (§4.5 failure semantics) -- there is no
    /// fallible path here today, but callers should never propagate a
    /// cache-layer error to the client.
    pub fn lookup(&self, key: &str) -> Lookup {
        let now = self.clock.now_nanos();
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.is_live(now) {
                let previous_access = entry.last_access_nanos;
                entry.touch(now);
                self.ttl_model.record_access(key, Some(previous_access), now);
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Lookup::Hit(entry.data.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Lookup::Miss
    }

    /// Run `fetch` as the single-flight leader for `key` on a miss, store
    /// the result on success, and record a cache failure (never surfaced
    /// to the client beyond a miss) on error.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        chain: &str,
        key: &str,
        min_ttl: Duration,
        max_ttl: Duration,
        fetch: F,
    ) -> FlightResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult>,
    {
        if let Lookup::Hit(data) = self.lookup(key) {
            return Ok(data);
        }

        let result = self.single_flight.run(key, fetch).await;
        match &result {
            Ok(data) => self.store(chain, key, data.clone(), min_ttl, max_ttl),
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    fn store(&self, chain: &str, key: &str, data: Bytes, min_ttl: Duration, max_ttl: Duration) {
        let now = self.clock.now_nanos();
        let mut predicted = self.ttl_model.predict(key, min_ttl, max_ttl);
        if self.latency.is_aggressive(chain) {
            predicted = predicted.mul_f64(TTL_MULTIPLIER);
        }
        self.entries
            .insert(key.to_string(), CacheEntry::fresh(data, now, predicted.as_nanos() as u64));
        self.evict_if_over_capacity();
    }

    fn evict_if_over_capacity(&self) {
        if self.entries.len() <= self.capacity {
            return;
        }
        let now = self.clock.now_nanos();
        let victim = self
            .entries
            .iter()
            .min_by(|a, b| {
                a.value()
                    .eviction_value(now)
                    .total_cmp(&b.value().eviction_value(now))
            })
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.ttl_model.forget(&key);
        }
    }

    pub fn record_latency(&self, chain: &str, latency_ms: u64, target_ms: u64) {
        self.latency.record(chain, latency_ms, target_ms);
    }

    pub fn is_aggressive(&self, chain: &str) -> bool {
        self.latency.is_aggressive(chain)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_types::ManualClock;

    fn store(capacity: usize) -> CacheStore {
        CacheStore::new(Arc::new(ManualClock::new()), capacity)
    }

    #[tokio::test]
    async fn miss_then_hit_after_fetch() {
        let cache = store(10);
        let key = cache.key_for("ethereum", "eth_blockNumber", &serde_json::json!([]));
        let result = cache
            .get_or_fetch(
                "ethereum",
                &key,
                Duration::from_secs(1),
                Duration::from_secs(60),
                || async { Ok(Bytes::from_static(b"0x1")) },
            )
            .await;
        assert_eq!(result.unwrap(), Bytes::from_static(b"0x1"));
        assert!(matches!(cache.lookup(&key), Lookup::Hit(_)));
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_stored_and_increments_failure_counter() {
        let cache = store(10);
        let key = "k".to_string();
        let result: FlightResult = cache
            .get_or_fetch(
                "ethereum",
                &key,
                Duration::from_secs(1),
                Duration::from_secs(60),
                || async { Err(Arc::from("upstream down")) },
            )
            .await;
        assert!(result.is_err());
        assert!(matches!(cache.lookup(&key), Lookup::Miss));
        assert_eq!(cache.failures(), 1);
    }

    #[test]
    fn eviction_keeps_size_at_or_under_capacity() {
        let cache = store(2);
        for i in 0..5 {
            cache.store(
                "ethereum",
                &format!("k{i}"),
                Bytes::from_static(b"v"),
                Duration::from_secs(1),
                Duration::from_secs(60),
            );
        }
        assert!(cache.len() <= 2);
    }
}
