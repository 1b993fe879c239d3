//! Backend registry (§4.7): `register`, `get`, `list`, `status_all`.
//!
//! Each registered chain owns its backend, relay state machine, and
//! circuit breaker. Ownership is per-chain; the server process owns the
//! registry itself.

use dashmap::DashMap;
use gw_breaker::CircuitBreaker;
use gw_types::{BlockTiming, BlockTimingWindow, BreakerParams, Clock};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::backend::ChainBackend;
use crate::state::{RelayState, RelayStateMachine};

pub struct RegisteredBackend {
    pub backend: Arc<dyn ChainBackend>,
    pub relay: Arc<RelayStateMachine>,
    pub breaker: Arc<CircuitBreaker>,
    block_timings: Mutex<BlockTimingWindow>,
}

pub struct BackendRegistry {
    backends: DashMap<String, RegisteredBackend>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: DashMap::new(),
        }
    }

    pub fn register(
        &self,
        name: &str,
        backend: Arc<dyn ChainBackend>,
        breaker_params: BreakerParams,
        clock: Arc<dyn Clock>,
    ) {
        self.backends.insert(
            name.to_string(),
            RegisteredBackend {
                backend,
                relay: Arc::new(RelayStateMachine::new(clock.clone())),
                breaker: Arc::new(CircuitBreaker::new(breaker_params, clock)),
                block_timings: Mutex::new(BlockTimingWindow::new()),
            },
        );
    }

    /// Record a block's arrival for a chain's ETA prediction (§4.9). Called
    /// whenever a `latest_block` call returns a height we haven't seen yet.
    pub fn record_block_height(&self, name: &str, height: u64, size: u64, now_secs: u64) {
        if let Some(entry) = self.backends.get(name) {
            entry.block_timings.lock().push(BlockTiming {
                height,
                arrival_timestamp: now_secs,
                size,
            });
        }
    }

    /// Mean inter-block interval over the chain's recent arrivals, or
    /// `None` with fewer than two recorded blocks (§4.9).
    pub fn next_block_eta_secs(&self, name: &str) -> Option<f64> {
        self.backends.get(name)?.block_timings.lock().next_block_eta_secs()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ChainBackend>> {
        self.backends.get(name).map(|entry| entry.backend.clone())
    }

    pub fn relay_state_of(&self, name: &str) -> Option<Arc<RelayStateMachine>> {
        self.backends.get(name).map(|entry| entry.relay.clone())
    }

    pub fn breaker_of(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.backends.get(name).map(|entry| entry.breaker.clone())
    }

    pub fn list(&self) -> Vec<String> {
        self.backends.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn status_all(&self) -> Vec<(String, RelayState)> {
        self.backends
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().relay.state()))
            .collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gw_types::{ManualClock, Tier};
    use serde_json::Value;
    use std::time::Duration;

    struct StubBackend;

    #[async_trait]
    impl ChainBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        async fn call(
            &self,
            _method: &str,
            _params: Value,
            _timeout: Duration,
        ) -> Result<Value, crate::backend::BackendError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn register_and_lookup_round_trips() {
        let registry = BackendRegistry::new();
        registry.register(
            "ethereum",
            Arc::new(StubBackend),
            Tier::Free.breaker_params(),
            Arc::new(ManualClock::new()),
        );
        assert!(registry.get("ethereum").is_some());
        assert!(registry.get("bitcoin").is_none());
        assert_eq!(registry.list(), vec!["ethereum".to_string()]);
    }

    #[test]
    fn status_all_reports_initial_disconnected_state() {
        let registry = BackendRegistry::new();
        registry.register(
            "ethereum",
            Arc::new(StubBackend),
            Tier::Free.breaker_params(),
            Arc::new(ManualClock::new()),
        );
        let status = registry.status_all();
        assert_eq!(status, vec![("ethereum".to_string(), RelayState::Disconnected)]);
    }
}
