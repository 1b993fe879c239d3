//! Background refresh workers for the fastpath snapshots (§4.6). Each loop
//! polls the default chain's backend on a fixed interval and republishes
//! pre-encoded JSON bytes; handlers only ever read via `FastpathSnapshot::load`.

use bytes::Bytes;
use gw_relay::{FastpathSnapshot, LATEST_REFRESH_INTERVAL, STATUS_REFRESH_INTERVAL};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::server::Server;

pub fn spawn_refreshers(server: Arc<Server>) {
    let Some(chain) = server.config.default_chain() else {
        return;
    };
    tokio::spawn(refresh_loop(
        server.clone(),
        chain.clone(),
        "latest_block",
        LATEST_REFRESH_INTERVAL,
        server.fastpath_latest.clone(),
    ));
    tokio::spawn(refresh_loop(
        server.clone(),
        chain,
        "network_info",
        STATUS_REFRESH_INTERVAL,
        server.fastpath_status.clone(),
    ));
}

async fn refresh_loop(
    server: Arc<Server>,
    chain: String,
    method: &'static str,
    interval: Duration,
    snapshot: Arc<FastpathSnapshot>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let Some(backend) = server.backends.get(&chain) else {
            continue;
        };
        match backend.call(method, Value::Array(vec![]), Duration::from_secs(5)).await {
            Ok(result) => {
                if method == "latest_block" {
                    if let Some(height) = result.as_u64().or_else(|| {
                        result.as_object().and_then(|o| o.get("height")).and_then(Value::as_u64)
                    }) {
                        let size = result.to_string().len() as u64;
                        server.backends.record_block_height(&chain, height, size, gw_types::unix_now());
                    }
                }
                let payload = json!({ "result": result, "chain": chain });
                snapshot.publish(Bytes::from(payload.to_string()));
            }
            Err(e) => {
                warn!(chain = %chain, method, error = %e, "fastpath refresh failed, keeping stale snapshot");
            }
        }
    }
}
