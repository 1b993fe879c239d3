//! Service tiers and the numeric budgets they carry.
//!
//! Tiers are totally ordered by capability (§3 DATA MODEL). The ordering
//! comes from the enum's declaration order via `derive(PartialOrd, Ord)`,
//! matching `VenueId`-style discriminant enums in the teacher codebase.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Business,
    Turbo,
    Enterprise,
}

impl Tier {
    /// Parse a tier string from the key registry JSON, degrading unknown
    /// strings to `Free` rather than rejecting the record (§4.2, §9).
    pub fn from_str_lenient(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pro" => Tier::Pro,
            "business" => Tier::Business,
            "turbo" => Tier::Turbo,
            "enterprise" => Tier::Enterprise,
            "free" => Tier::Free,
            _ => Tier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Business => "business",
            Tier::Turbo => "turbo",
            Tier::Enterprise => "enterprise",
        }
    }

    /// Numeric budgets for this tier (§4.1).
    pub fn budgets(&self) -> TierBudgets {
        match self {
            Tier::Free => TierBudgets {
                hourly_requests: 100,
                refill_per_sec: 100.0 / 3600.0,
                concurrent_ceiling: 4,
                ws_per_ip_cap: 2,
                ws_per_chain_cap: 10,
                latency_target_ms: 250,
                cache_min_ttl: Duration::from_secs(5),
                cache_max_ttl: Duration::from_secs(60),
            },
            Tier::Pro => TierBudgets {
                hourly_requests: 1_000,
                refill_per_sec: 1_000.0 / 3600.0,
                concurrent_ceiling: 16,
                ws_per_ip_cap: 5,
                ws_per_chain_cap: 50,
                latency_target_ms: 150,
                cache_min_ttl: Duration::from_secs(2),
                cache_max_ttl: Duration::from_secs(30),
            },
            Tier::Business => TierBudgets {
                hourly_requests: 5_000,
                refill_per_sec: 5_000.0 / 3600.0,
                concurrent_ceiling: 64,
                ws_per_ip_cap: 10,
                ws_per_chain_cap: 200,
                latency_target_ms: 100,
                cache_min_ttl: Duration::from_millis(500),
                cache_max_ttl: Duration::from_secs(20),
            },
            Tier::Turbo => TierBudgets {
                hourly_requests: 10_000,
                refill_per_sec: 10_000.0 / 3600.0,
                concurrent_ceiling: 128,
                ws_per_ip_cap: 20,
                ws_per_chain_cap: 500,
                latency_target_ms: 75,
                cache_min_ttl: Duration::from_millis(200),
                cache_max_ttl: Duration::from_secs(10),
            },
            Tier::Enterprise => TierBudgets {
                hourly_requests: 50_000,
                refill_per_sec: 50_000.0 / 3600.0,
                concurrent_ceiling: 512,
                ws_per_ip_cap: 50,
                ws_per_chain_cap: 2_000,
                latency_target_ms: 50,
                cache_min_ttl: Duration::from_millis(100),
                cache_max_ttl: Duration::from_secs(5),
            },
        }
    }

    /// Circuit breaker parameters for this tier (§4.4).
    pub fn breaker_params(&self) -> BreakerParams {
        match self {
            Tier::Free => BreakerParams {
                failure_threshold: 3,
                reset_timeout: Duration::from_secs(120),
                halfopen_max_calls: 1,
            },
            Tier::Pro | Tier::Business => BreakerParams {
                failure_threshold: 10,
                reset_timeout: Duration::from_secs(30),
                halfopen_max_calls: 5,
            },
            Tier::Turbo | Tier::Enterprise => BreakerParams {
                failure_threshold: 20,
                reset_timeout: Duration::from_secs(15),
                halfopen_max_calls: 10,
            },
        }
    }

    /// Whether calls rejected by an open circuit are queued for retry
    /// instead of being dropped outright (§4.4).
    pub fn should_queue(&self) -> bool {
        !matches!(self, Tier::Free)
    }

    /// Minimal whitespace, HTML-escape-disabled JSON encoding for the
    /// higher tiers (§4.8 step 5).
    pub fn compact_json(&self) -> bool {
        matches!(self, Tier::Turbo | Tier::Enterprise)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TierBudgets {
    pub hourly_requests: u32,
    pub refill_per_sec: f64,
    pub concurrent_ceiling: u32,
    pub ws_per_ip_cap: u32,
    pub ws_per_chain_cap: u32,
    pub latency_target_ms: u64,
    pub cache_min_ttl: Duration,
    pub cache_max_ttl: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerParams {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub halfopen_max_calls: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_totally_ordered_by_capability() {
        assert!(Tier::Free < Tier::Pro);
        assert!(Tier::Pro < Tier::Business);
        assert!(Tier::Business < Tier::Turbo);
        assert!(Tier::Turbo < Tier::Enterprise);
    }

    #[test]
    fn unknown_tier_degrades_to_free() {
        assert_eq!(Tier::from_str_lenient("platinum"), Tier::Free);
        assert_eq!(Tier::from_str_lenient("PRO"), Tier::Pro);
    }
}
