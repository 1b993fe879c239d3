//! Per-chain connection lifecycle driver (§4.7). One task per configured
//! chain: attempts a connection when the backoff window allows it, then
//! probes health on a fixed tick while connected.

use gw_relay::{backoff_for_attempt, probe_connect, probe_health, RelayState, PROBE_TICK_INTERVAL};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::server::Server;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub fn spawn_relay_loops(server: Arc<Server>) {
    for chain in server.backends.list() {
        tokio::spawn(drive_chain(server.clone(), chain));
    }
}

async fn drive_chain(server: Arc<Server>, chain: String) {
    let Some(backend) = server.backends.get(&chain) else { return };
    let Some(relay) = server.backends.relay_state_of(&chain) else { return };
    let mut attempt: u32 = 0;
    let mut last_sync_progress: Option<u64> = None;

    loop {
        match relay.state() {
            RelayState::Closed => return,
            RelayState::Disconnected => {
                if !relay.should_attempt_connect() {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
                if probe_connect(backend.as_ref(), CONNECT_TIMEOUT).await {
                    info!(chain = %chain, "connected");
                    relay.record_connect_success();
                    attempt = 0;
                } else {
                    attempt = attempt.saturating_add(1);
                    let backoff = backoff_for_attempt(attempt, server.random.as_ref());
                    warn!(chain = %chain, attempt, backoff_ms = backoff.as_millis() as u64, "connect attempt failed");
                    relay.record_connect_failure(backoff);
                }
            }
            RelayState::Connected | RelayState::Degraded => {
                tokio::time::sleep(PROBE_TICK_INTERVAL).await;
                let outcome = probe_health(backend.as_ref(), PROBE_TIMEOUT, &mut last_sync_progress).await;
                if !outcome.connected {
                    relay.record_connect_failure(backoff_for_attempt(1, server.random.as_ref()));
                    continue;
                }
                relay.record_probe(outcome.healthy);
            }
        }
    }
}
