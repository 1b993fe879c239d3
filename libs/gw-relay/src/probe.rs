//! Health probes run against a chain backend (§4.7): `latest_block`,
//! `peer_count`, `sync_status`, `network_info`. Each is a small RPC call
//! with a tier-derived timeout -- higher tiers use a shorter timeout so a
//! degrading upstream is detected sooner for their traffic.

use serde_json::Value;
use std::time::Duration;

use crate::backend::{BackendError, ChainBackend};

pub const PROBE_METHODS: &[&str] = &["latest_block", "peer_count", "sync_status", "network_info"];

pub const PROBE_TICK_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct ProbeOutcome {
    pub connected: bool,
    pub healthy: bool,
}

/// Probe connectivity by calling `latest_block` against each endpoint in
/// order, returning on the first success (§4.7 `Connecting -> Connected`).
pub async fn probe_connect(backend: &dyn ChainBackend, timeout: Duration) -> bool {
    backend.call("latest_block", Value::Array(vec![]), timeout).await.is_ok()
}

/// Routine health probe while `Connected`/`Degraded`: healthy unless
/// `peer_count` reports zero, the `sync_status` probe shows the chain's
/// sync progress regressing since the last check, or the call fails
/// outright (§4.7). `last_sync_progress` carries the previous check's
/// reading across calls for the regression comparison; the caller owns it
/// for the lifetime of one chain's relay loop.
pub async fn probe_health(
    backend: &dyn ChainBackend,
    timeout: Duration,
    last_sync_progress: &mut Option<u64>,
) -> ProbeOutcome {
    let peers = match backend.call("peer_count", Value::Array(vec![]), timeout).await {
        Ok(value) => Ok(value.as_u64().unwrap_or(1)),
        Err(err) => Err(err),
    };
    let (connected, peer_healthy) = match peers {
        Ok(peer_count) => (true, peer_count > 0),
        Err(BackendError::Timeout(_)) | Err(BackendError::Transport(_)) => {
            return ProbeOutcome { connected: false, healthy: false };
        }
        Err(BackendError::RpcError(_)) => (true, false),
    };

    let sync_regressed = match backend.call("sync_status", Value::Array(vec![]), timeout).await {
        Ok(value) => {
            let progress = extract_sync_progress(&value);
            let regressed = matches!((*last_sync_progress, progress), (Some(prev), Some(cur)) if cur < prev);
            if progress.is_some() {
                *last_sync_progress = progress;
            }
            regressed
        }
        Err(_) => false,
    };

    ProbeOutcome {
        connected,
        healthy: peer_healthy && !sync_regressed,
    }
}

/// Best-effort numeric sync progress extraction, mirroring the block-height
/// extraction used for the universal dispatcher's `latest_block` recorder.
fn extract_sync_progress(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let obj = value.as_object()?;
    for field in ["current_block", "height", "progress", "synced_blocks"] {
        if let Some(n) = obj.get(field).and_then(Value::as_u64) {
            return Some(n);
        }
    }
    None
}
