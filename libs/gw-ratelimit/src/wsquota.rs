//! Hierarchical WebSocket connection quota (§4.3).
//!
//! A connection must acquire capacity at three levels -- global, per-IP,
//! per-chain -- in that order. Acquisition is all-or-nothing: if any level
//! is full, every level already acquired for this attempt is released
//! before returning. The returned `WsQuotaGuard` releases all three levels
//! symmetrically, in reverse acquisition order, on drop.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Counters {
    global: AtomicU64,
    global_cap: u64,
    per_ip: DashMap<String, u64>,
    per_chain: DashMap<String, u64>,
}

pub struct WsQuotaAccountant {
    inner: Arc<Counters>,
}

impl WsQuotaAccountant {
    pub fn new(global_cap: u64) -> Self {
        Self {
            inner: Arc::new(Counters {
                global: AtomicU64::new(0),
                global_cap,
                per_ip: DashMap::new(),
                per_chain: DashMap::new(),
            }),
        }
    }

    /// Attempt to acquire one connection slot against all three levels.
    /// Returns `None` if any level is at capacity; any levels already
    /// incremented during this attempt are rolled back before returning.
    pub fn try_acquire(
        &self,
        client_ip: &str,
        chain: &str,
        ip_cap: u64,
        chain_cap: u64,
    ) -> Option<WsQuotaGuard> {
        if !try_bump(&self.inner.global, self.inner.global_cap) {
            return None;
        }
        if !try_bump_keyed(&self.inner.per_ip, client_ip, ip_cap) {
            self.inner.global.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        if !try_bump_keyed(&self.inner.per_chain, chain, chain_cap) {
            release_keyed(&self.inner.per_ip, client_ip);
            self.inner.global.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(WsQuotaGuard {
            inner: self.inner.clone(),
            client_ip: client_ip.to_string(),
            chain: chain.to_string(),
        })
    }

    pub fn global_count(&self) -> u64 {
        self.inner.global.load(Ordering::SeqCst)
    }

    pub fn ip_count(&self, client_ip: &str) -> u64 {
        self.inner.per_ip.get(client_ip).map(|v| *v).unwrap_or(0)
    }

    pub fn chain_count(&self, chain: &str) -> u64 {
        self.inner.per_chain.get(chain).map(|v| *v).unwrap_or(0)
    }
}

fn try_bump(counter: &AtomicU64, cap: u64) -> bool {
    let mut current = counter.load(Ordering::SeqCst);
    loop {
        if current >= cap {
            return false;
        }
        match counter.compare_exchange_weak(
            current,
            current + 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => return true,
            Err(observed) => current = observed,
        }
    }
}

fn try_bump_keyed(map: &DashMap<String, u64>, key: &str, cap: u64) -> bool {
    let mut entry = map.entry(key.to_string()).or_insert(0);
    if *entry >= cap {
        false
    } else {
        *entry += 1;
        true
    }
}

fn release_keyed(map: &DashMap<String, u64>, key: &str) {
    if let Some(mut entry) = map.get_mut(key) {
        *entry = entry.saturating_sub(1);
    }
}

/// Releases its slot at all three levels on drop, in reverse acquisition
/// order (chain, then IP, then global).
pub struct WsQuotaGuard {
    inner: Arc<Counters>,
    client_ip: String,
    chain: String,
}

impl Drop for WsQuotaGuard {
    fn drop(&mut self) {
        release_keyed(&self.inner.per_chain, &self.chain);
        release_keyed(&self.inner.per_ip, &self.client_ip);
        self.inner.global.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_round_trips() {
        let accountant = WsQuotaAccountant::new(10);
        let guard = accountant.try_acquire("1.2.3.4", "eth", 5, 5).unwrap();
        assert_eq!(accountant.global_count(), 1);
        assert_eq!(accountant.ip_count("1.2.3.4"), 1);
        assert_eq!(accountant.chain_count("eth"), 1);
        drop(guard);
        assert_eq!(accountant.global_count(), 0);
        assert_eq!(accountant.ip_count("1.2.3.4"), 0);
        assert_eq!(accountant.chain_count("eth"), 0);
    }

    #[test]
    fn per_ip_cap_blocks_further_acquisition_without_leaking_global() {
        let accountant = WsQuotaAccountant::new(10);
        let _g1 = accountant.try_acquire("1.2.3.4", "eth", 1, 10).unwrap();
        assert!(accountant.try_acquire("1.2.3.4", "eth", 1, 10).is_none());
        // global was bumped then rolled back on the failed second attempt
        assert_eq!(accountant.global_count(), 1);
    }

    #[test]
    fn per_chain_cap_blocks_without_leaking_ip_or_global() {
        let accountant = WsQuotaAccountant::new(10);
        let _g1 = accountant.try_acquire("1.2.3.4", "eth", 10, 1).unwrap();
        assert!(accountant.try_acquire("5.6.7.8", "eth", 10, 1).is_none());
        assert_eq!(accountant.global_count(), 1);
        assert_eq!(accountant.ip_count("5.6.7.8"), 0);
    }

    #[test]
    fn global_cap_blocks_all_connections() {
        let accountant = WsQuotaAccountant::new(1);
        let _g1 = accountant.try_acquire("1.2.3.4", "eth", 10, 10).unwrap();
        assert!(accountant.try_acquire("5.6.7.8", "btc", 10, 10).is_none());
    }
}
