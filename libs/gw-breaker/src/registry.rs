//! Per-chain breaker registry (§4.4). One breaker per chain backend; the
//! breaker's thresholds are fixed to whichever tier first creates the
//! entry, since the chain's underlying health is shared infrastructure.

use dashmap::DashMap;
use gw_types::{BreakerParams, Clock, Tier};
use std::sync::Arc;

use crate::breaker::{CircuitBreaker, CircuitState};

pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    clock: Arc<dyn Clock>,
}

impl BreakerRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            breakers: DashMap::new(),
            clock,
        }
    }

    pub fn get_or_create(&self, chain: &str, params: BreakerParams) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(chain.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(params, self.clock.clone())))
            .clone()
    }

    pub fn state_of(&self, chain: &str) -> Option<CircuitState> {
        self.breakers.get(chain).map(|b| b.state())
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }
}

/// Whether a request that can't be served immediately (breaker open, or
/// backend momentarily unavailable) should be queued and retried rather
/// than failed outright (§4.4, §3 `Tier::should_queue`).
pub fn should_queue(tier: Tier) -> bool {
    tier.should_queue()
}
