//! Fastpath snapshots for the hottest endpoints (§4.6): `latest` and
//! `status` of the default chain are pre-encoded into an immutable byte
//! slice published behind an atomic pointer. Handlers perform one atomic
//! load and no per-request allocation.

use arc_swap::ArcSwap;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const LATEST_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const STATUS_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

pub struct FastpathSnapshot {
    bytes: ArcSwap<Bytes>,
    hits: AtomicU64,
}

impl FastpathSnapshot {
    pub fn empty() -> Self {
        Self {
            bytes: ArcSwap::from_pointee(Bytes::new()),
            hits: AtomicU64::new(0),
        }
    }

    /// Replace the published bytes. Called by a refresh worker on its
    /// fixed interval; never called from a request-handling path.
    pub fn publish(&self, data: Bytes) {
        self.bytes.store(std::sync::Arc::new(data));
    }

    /// Load the currently published bytes, recording a fastpath hit.
    pub fn load(&self) -> Bytes {
        self.hits.fetch_add(1, Ordering::Relaxed);
        (**self.bytes.load()).clone()
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.load().is_empty()
    }
}

impl Default for FastpathSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_then_load_round_trips() {
        let snapshot = FastpathSnapshot::empty();
        assert!(snapshot.is_empty());
        snapshot.publish(Bytes::from_static(b"{\"block\":1}"));
        assert_eq!(snapshot.load(), Bytes::from_static(b"{\"block\":1}"));
        assert_eq!(snapshot.hit_count(), 1);
    }

    #[test]
    fn load_counts_every_access() {
        let snapshot = FastpathSnapshot::empty();
        snapshot.publish(Bytes::from_static(b"x"));
        for _ in 0..5 {
            snapshot.load();
        }
        assert_eq!(snapshot.hit_count(), 5);
    }
}
