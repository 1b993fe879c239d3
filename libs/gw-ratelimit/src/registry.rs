//! Identifier-keyed bucket registry (§4.1). Identifiers are arbitrary
//! strings -- callers build `client_ip`, `client_ip:keygen`, or
//! `key_digest` as needed; the registry itself is identifier-agnostic.

use dashmap::DashMap;
use gw_types::Clock;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::bucket::RateBucket;

pub struct TokenBucketLimiter {
    buckets: DashMap<String, Mutex<RateBucket>>,
    clock: Arc<dyn Clock>,
}

impl TokenBucketLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
        }
    }

    /// Non-blocking admission check; creates a full bucket for unseen
    /// identifiers so first use never spuriously denies (§4.1).
    pub fn allow(&self, identifier: &str, capacity: f64, refill_rate: f64) -> bool {
        let now = self.clock.now_nanos();
        let entry = self
            .buckets
            .entry(identifier.to_string())
            .or_insert_with(|| Mutex::new(RateBucket::full(capacity, refill_rate, now)));
        entry.lock().allow(now)
    }

    /// Drop buckets untouched since before `now - idle_nanos`. Safe to run
    /// concurrently with `allow`: a bucket evicted mid-use just starts full
    /// again on its next lookup, which is never an invariant violation.
    pub fn sweep(&self, idle_nanos: u64) {
        let now = self.clock.now_nanos();
        self.buckets
            .retain(|_, bucket| now.saturating_sub(bucket.lock().last_refill_nanos()) < idle_nanos);
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_types::ManualClock;

    #[test]
    fn first_use_of_unseen_identifier_is_full() {
        let clock = Arc::new(ManualClock::new());
        let limiter = TokenBucketLimiter::new(clock);
        assert!(limiter.allow("1.2.3.4", 1.0, 1.0));
        assert!(!limiter.allow("1.2.3.4", 1.0, 1.0));
    }

    #[test]
    fn identifiers_are_independent() {
        let clock = Arc::new(ManualClock::new());
        let limiter = TokenBucketLimiter::new(clock);
        assert!(limiter.allow("a", 1.0, 1.0));
        assert!(limiter.allow("b", 1.0, 1.0));
        assert_eq!(limiter.len(), 2);
    }
}
