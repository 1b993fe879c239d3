//! Three-state circuit breaker (§4.4).
//!
//! ```text
//! Closed --failure_threshold--> Open --reset_timeout--> HalfOpen
//!   ^                                                      |
//!   +---------------------- first success -------------------+
//!                              |
//!                           failure --> Open
//! ```

use gw_types::{BreakerParams, Clock};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_calls: u32,
    half_open_successes: u32,
    opened_at_nanos: u64,
}

/// A single chain backend's failure gate. Params are fixed at construction;
/// a caller serving multiple tiers against the same breaker should build it
/// from the most conservative tier in play (or keep one breaker per tier,
/// see [`crate::registry::BreakerRegistry`]).
pub struct CircuitBreaker {
    params: BreakerParams,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(params: BreakerParams, clock: Arc<dyn Clock>) -> Self {
        Self {
            params,
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_calls: 0,
                half_open_successes: 0,
                opened_at_nanos: 0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Decide whether a call may proceed, transitioning Open -> HalfOpen
    /// when the reset timeout has elapsed.
    pub fn allow_call(&self) -> bool {
        let now = self.clock.now_nanos();
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = now.saturating_sub(inner.opened_at_nanos);
                if elapsed >= self.params.reset_timeout.as_nanos() as u64 {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_calls = 0;
                    inner.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.params.halfopen_max_calls {
                    inner.half_open_calls += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                inner.state = CircuitState::Closed;
            }
            CircuitState::Closed | CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let now = self.clock.now_nanos();
        let mut inner = self.inner.lock();
        inner.consecutive_failures += 1;
        match inner.state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.params.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at_nanos = now;
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at_nanos = now;
                inner.half_open_calls = 0;
                inner.half_open_successes = 0;
            }
            CircuitState::Open => {
                inner.opened_at_nanos = now;
            }
        }
    }
}
