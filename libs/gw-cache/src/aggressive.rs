//! Per-chain p99 latency tracking and "aggressive" cache mode (§4.5).
//!
//! Resolved constants (the source left these unspecified, §9 Open
//! Questions): a chain enters aggressive mode after 5 consecutive
//! measurement windows with p99 latency above the tier's target, and
//! leaves it after 5 consecutive windows back under target. While active,
//! TTLs are multiplied by 3 and the well-known methods are proactively
//! refreshed every 2 seconds.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

pub const TTL_MULTIPLIER: f64 = 3.0;
pub const REFRESH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);
pub const ENTER_THRESHOLD_WINDOWS: u32 = 5;
pub const EXIT_THRESHOLD_WINDOWS: u32 = 5;
pub const LATENCY_SAMPLE_WINDOW: usize = 100;

pub const WELL_KNOWN_METHODS: &[&str] = &["latest_block", "gas_price", "chain_id", "peer_count"];

struct ChainLatency {
    samples_ms: Mutex<VecDeque<u64>>,
    consecutive_violations: Mutex<u32>,
    consecutive_compliant: Mutex<u32>,
    aggressive: AtomicBool,
}

pub struct LatencyTracker {
    chains: DashMap<String, ChainLatency>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self {
            chains: DashMap::new(),
        }
    }

    fn entry(&self, chain: &str) -> dashmap::mapref::one::RefMut<'_, String, ChainLatency> {
        self.chains
            .entry(chain.to_string())
            .or_insert_with(|| ChainLatency {
                samples_ms: Mutex::new(VecDeque::new()),
                consecutive_violations: Mutex::new(0),
                consecutive_compliant: Mutex::new(0),
                aggressive: AtomicBool::new(false),
            })
    }

    /// Record one request's latency and evaluate this measurement window
    /// against the tier's target, updating aggressive-mode hysteresis.
    pub fn record(&self, chain: &str, latency_ms: u64, target_ms: u64) {
        let entry = self.entry(chain);
        let p99 = {
            let mut samples = entry.samples_ms.lock();
            samples.push_back(latency_ms);
            if samples.len() > LATENCY_SAMPLE_WINDOW {
                samples.pop_front();
            }
            p99_of(&samples)
        };

        let violated = p99 > target_ms;
        if violated {
            let mut violations = entry.consecutive_violations.lock();
            *violations += 1;
            *entry.consecutive_compliant.lock() = 0;
            if *violations >= ENTER_THRESHOLD_WINDOWS {
                entry.aggressive.store(true, Ordering::SeqCst);
            }
        } else {
            let mut compliant = entry.consecutive_compliant.lock();
            *compliant += 1;
            *entry.consecutive_violations.lock() = 0;
            if *compliant >= EXIT_THRESHOLD_WINDOWS {
                entry.aggressive.store(false, Ordering::SeqCst);
            }
        }
    }

    pub fn is_aggressive(&self, chain: &str) -> bool {
        self.entry(chain).aggressive.load(Ordering::SeqCst)
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn p99_of(samples: &VecDeque<u64>) -> u64 {
    if samples.is_empty() {
        return 0;
    }
    let mut sorted: Vec<u64> = samples.iter().copied().collect();
    sorted.sort_unstable();
    let idx = ((sorted.len() as f64) * 0.99).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enters_aggressive_after_sustained_violations() {
        let tracker = LatencyTracker::new();
        for _ in 0..ENTER_THRESHOLD_WINDOWS {
            tracker.record("ethereum", 500, 100);
        }
        assert!(tracker.is_aggressive("ethereum"));
    }

    #[test]
    fn single_violation_does_not_trigger_aggressive_mode() {
        let tracker = LatencyTracker::new();
        tracker.record("ethereum", 500, 100);
        assert!(!tracker.is_aggressive("ethereum"));
    }

    #[test]
    fn leaves_aggressive_after_sustained_compliance() {
        let tracker = LatencyTracker::new();
        for _ in 0..ENTER_THRESHOLD_WINDOWS {
            tracker.record("ethereum", 500, 100);
        }
        assert!(tracker.is_aggressive("ethereum"));
        for _ in 0..EXIT_THRESHOLD_WINDOWS {
            tracker.record("ethereum", 10, 100);
        }
        assert!(!tracker.is_aggressive("ethereum"));
    }

    #[test]
    fn chains_are_tracked_independently() {
        let tracker = LatencyTracker::new();
        for _ in 0..ENTER_THRESHOLD_WINDOWS {
            tracker.record("ethereum", 500, 100);
        }
        assert!(tracker.is_aggressive("ethereum"));
        assert!(!tracker.is_aggressive("bitcoin"));
    }
}
