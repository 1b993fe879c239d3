//! Stored cache entries (§3 `CacheEntry`).

use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Bytes,
    pub created_at_nanos: u64,
    pub last_access_nanos: u64,
    pub access_count: u64,
    pub predicted_ttl_nanos: u64,
}

impl CacheEntry {
    pub fn fresh(data: Bytes, now_nanos: u64, predicted_ttl_nanos: u64) -> Self {
        Self {
            data,
            created_at_nanos: now_nanos,
            last_access_nanos: now_nanos,
            access_count: 0,
            predicted_ttl_nanos,
        }
    }

    pub fn is_live(&self, now_nanos: u64) -> bool {
        now_nanos.saturating_sub(self.created_at_nanos) < self.predicted_ttl_nanos
    }

    pub fn touch(&mut self, now_nanos: u64) {
        self.last_access_nanos = now_nanos;
        self.access_count += 1;
    }

    /// `prediction_score * recency`: entries with a long remaining TTL and
    /// a recent last access are the most valuable to keep (§4.5 eviction).
    pub fn eviction_value(&self, now_nanos: u64) -> f64 {
        let age_since_access_secs =
            now_nanos.saturating_sub(self.last_access_nanos) as f64 / 1e9;
        let recency = 1.0 / (1.0 + age_since_access_secs);
        let prediction_score = self.predicted_ttl_nanos as f64;
        prediction_score * recency
    }
}
