//! Chain relay connection state machine (§4.7).
//!
//! ```text
//! Disconnected --first request / pre-warm--> Connecting
//! Connecting --probe succeeds--> Connected
//! Connecting --all endpoints fail--> Disconnected (schedule backoff)
//! Connected --peer_count==0 / sync regression x N--> Degraded
//! Degraded --successful probe--> Connected
//! Any --shutdown--> Closed
//! ```

use gw_types::Clock;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Disconnected,
    Connecting,
    Connected,
    Degraded,
    Closed,
}

/// Consecutive degraded-probe checks required before `Connected -> Degraded`.
pub const DEGRADATION_THRESHOLD: u32 = 3;

struct Inner {
    state: RelayState,
    consecutive_attempts: u32,
    consecutive_degraded_probes: u32,
    next_attempt_at_nanos: u64,
}

pub struct RelayStateMachine {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl RelayStateMachine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner {
                state: RelayState::Disconnected,
                consecutive_attempts: 0,
                consecutive_degraded_probes: 0,
                next_attempt_at_nanos: 0,
            }),
        }
    }

    pub fn state(&self) -> RelayState {
        self.inner.lock().state
    }

    /// Returns true if a connection attempt may be started now, either
    /// because this is the first request or the backoff window has
    /// elapsed. Transitions into `Connecting` on true.
    pub fn should_attempt_connect(&self) -> bool {
        let now = self.clock.now_nanos();
        let mut inner = self.inner.lock();
        match inner.state {
            RelayState::Disconnected => {
                if now >= inner.next_attempt_at_nanos {
                    inner.state = RelayState::Connecting;
                    true
                } else {
                    false
                }
            }
            RelayState::Closed => false,
            _ => false,
        }
    }

    pub fn record_connect_success(&self) {
        let mut inner = self.inner.lock();
        inner.state = RelayState::Connected;
        inner.consecutive_attempts = 0;
        inner.consecutive_degraded_probes = 0;
    }

    /// All candidate endpoints failed this attempt; fall back to
    /// `Disconnected` and schedule the next attempt after `backoff`.
    pub fn record_connect_failure(&self, backoff: std::time::Duration) {
        let now = self.clock.now_nanos();
        let mut inner = self.inner.lock();
        inner.state = RelayState::Disconnected;
        inner.consecutive_attempts += 1;
        inner.next_attempt_at_nanos = now + backoff.as_nanos() as u64;
    }

    pub fn attempt_count(&self) -> u32 {
        self.inner.lock().consecutive_attempts
    }

    /// Report the result of a routine health probe while `Connected` or
    /// `Degraded`. `healthy=false` accumulates toward the degradation
    /// threshold; any healthy probe immediately restores `Connected`.
    pub fn record_probe(&self, healthy: bool) {
        let mut inner = self.inner.lock();
        if !matches!(inner.state, RelayState::Connected | RelayState::Degraded) {
            return;
        }
        if healthy {
            inner.consecutive_degraded_probes = 0;
            inner.state = RelayState::Connected;
        } else {
            inner.consecutive_degraded_probes += 1;
            if inner.consecutive_degraded_probes >= DEGRADATION_THRESHOLD {
                inner.state = RelayState::Degraded;
            }
        }
    }

    pub fn close(&self) {
        self.inner.lock().state = RelayState::Closed;
    }
}
