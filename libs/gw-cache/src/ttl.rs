//! Per-key TTL prediction from inter-access interval history (§4.5).
//!
//! `predicted_ttl = clamp(median(recent_intervals), tier_min_ttl,
//! tier_max_ttl)`. A key with fewer than two recorded accesses has no
//! history yet and predicts `tier_min_ttl`, the conservative default.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

const MAX_INTERVALS: usize = 20;

pub struct TtlModel {
    intervals: DashMap<String, Mutex<VecDeque<u64>>>,
}

impl TtlModel {
    pub fn new() -> Self {
        Self {
            intervals: DashMap::new(),
        }
    }

    /// Record an access to `key` at `now_nanos`, given the timestamp of its
    /// previous access (if any).
    pub fn record_access(&self, key: &str, previous_access_nanos: Option<u64>, now_nanos: u64) {
        let Some(previous) = previous_access_nanos else {
            self.intervals
                .entry(key.to_string())
                .or_insert_with(|| Mutex::new(VecDeque::new()));
            return;
        };
        if now_nanos <= previous {
            return;
        }
        let interval = now_nanos - previous;
        let entry = self
            .intervals
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut history = entry.lock();
        history.push_back(interval);
        if history.len() > MAX_INTERVALS {
            history.pop_front();
        }
    }

    pub fn predict(&self, key: &str, min_ttl: Duration, max_ttl: Duration) -> Duration {
        let median_nanos = self
            .intervals
            .get(key)
            .and_then(|history| median(&history.lock()));
        match median_nanos {
            Some(nanos) => Duration::from_nanos(nanos).clamp(min_ttl, max_ttl),
            None => min_ttl,
        }
    }

    pub fn forget(&self, key: &str) {
        self.intervals.remove(key);
    }
}

impl Default for TtlModel {
    fn default() -> Self {
        Self::new()
    }
}

fn median(samples: &VecDeque<u64>) -> Option<u64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted: Vec<u64> = samples.iter().copied().collect();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_history_predicts_tier_minimum() {
        let model = TtlModel::new();
        let ttl = model.predict("k", Duration::from_secs(5), Duration::from_secs(60));
        assert_eq!(ttl, Duration::from_secs(5));
    }

    #[test]
    fn predicts_median_of_recorded_intervals() {
        let model = TtlModel::new();
        model.record_access("k", None, 0);
        model.record_access("k", Some(0), 10_000_000_000);
        model.record_access("k", Some(10_000_000_000), 30_000_000_000);
        let ttl = model.predict("k", Duration::from_secs(1), Duration::from_secs(60));
        // intervals: 10s, 20s -> median 15s
        assert_eq!(ttl, Duration::from_secs(15));
    }

    #[test]
    fn prediction_is_clamped_to_tier_bounds() {
        let model = TtlModel::new();
        model.record_access("k", None, 0);
        model.record_access("k", Some(0), 100_000_000_000);
        let ttl = model.predict("k", Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(ttl, Duration::from_secs(10));
    }

    #[test]
    fn history_is_bounded() {
        let model = TtlModel::new();
        let mut prev = 0u64;
        for i in 1..=(MAX_INTERVALS as u64 + 10) {
            let now = i * 1_000_000_000;
            model.record_access("k", Some(prev), now);
            prev = now;
        }
        let history = model.intervals.get("k").unwrap();
        assert_eq!(history.lock().len(), MAX_INTERVALS);
    }
}
