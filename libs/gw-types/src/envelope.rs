//! The universal response envelope returned by `/api/v1/universal/{chain}/{method}`
//! and related endpoints (§6.2).

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    pub response_time: String,
    pub tier_target: String,
    pub target_met: bool,
}

impl Performance {
    pub fn new(elapsed_ms: u128, tier_target_ms: u64) -> Self {
        Self {
            response_time: format!("{}ms", elapsed_ms),
            tier_target: format!("{}ms", tier_target_ms),
            target_met: elapsed_ms <= tier_target_ms as u128,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    pub chain: String,
    pub method: String,
    pub tier: String,
    pub timestamp: u64,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub performance: Performance,
}

impl ResponseEnvelope {
    pub fn success(
        chain: &str,
        method: &str,
        tier: &str,
        timestamp: u64,
        data: Value,
        perf: Performance,
    ) -> Self {
        Self {
            chain: chain.to_string(),
            method: method.to_string(),
            tier: tier.to_string(),
            timestamp,
            data: Some(data),
            error: None,
            performance: perf,
        }
    }

    pub fn failure(
        chain: &str,
        method: &str,
        tier: &str,
        timestamp: u64,
        error: &str,
        perf: Performance,
    ) -> Self {
        Self {
            chain: chain.to_string(),
            method: method.to_string(),
            tier: tier.to_string(),
            timestamp,
            data: None,
            error: Some(error.to_string()),
            performance: perf,
        }
    }
}
