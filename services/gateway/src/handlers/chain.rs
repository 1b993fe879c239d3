//! Direct per-chain endpoints: `/v1/{chain}/{latest,status,metrics}` and the
//! `/v1/{chain}/stream` WebSocket upgrade (§6.1). `latest` and `status` on
//! the configured default chain are served from the fastpath snapshot
//! instead of going through the cache/backend path (§4.6).

use gw_ratelimit::ApiKeyRecord;
use gw_types::ChainName;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::handlers::health::json_response;
use crate::handlers::universal::{self, CoreFailure};
use crate::server::Server;

/// Direct per-chain endpoints return component-specific JSON with the
/// actual HTTP status the outcome implies (§6.2) -- unlike the universal
/// dispatcher, which always answers `200` and folds failures into its
/// envelope. `latest_block` for the configured default chain is served
/// from the fastpath snapshot when warm (§4.6).
pub async fn latest(server: Arc<Server>, key: ApiKeyRecord, chain: String) -> Response<Body> {
    let chain = ChainName::resolve(&chain).as_str().to_string();
    if server.config.default_chain().as_deref() == Some(chain.as_str())
        && !server.fastpath_latest.is_empty()
    {
        return Response::builder()
            .status(200)
            .header("content-type", "application/json")
            .body(Body::from(server.fastpath_latest.load()))
            .unwrap_or_else(|_| Response::new(Body::from("internal error")));
    }
    direct_response(&chain, universal::execute(server.as_ref(), &key, &chain, "latest_block", Value::Array(vec![])).await)
}

pub async fn status(server: Arc<Server>, key: ApiKeyRecord, chain: String) -> Response<Body> {
    let chain = ChainName::resolve(&chain).as_str().to_string();
    if server.config.default_chain().as_deref() == Some(chain.as_str())
        && !server.fastpath_status.is_empty()
    {
        return Response::builder()
            .status(200)
            .header("content-type", "application/json")
            .body(Body::from(server.fastpath_status.load()))
            .unwrap_or_else(|_| Response::new(Body::from("internal error")));
    }
    direct_response(&chain, universal::execute(server.as_ref(), &key, &chain, "network_info", Value::Array(vec![])).await)
}

/// Build a direct endpoint's component JSON: `{chain, result, timestamp}`
/// on success, `{chain, error, timestamp}` on failure, with the failure's
/// `ErrorKind` driving the HTTP status (§6.2, §6.3, §7).
fn direct_response(
    chain: &str,
    outcome: Result<(Value, gw_types::Performance), (CoreFailure, gw_types::Performance)>,
) -> Response<Body> {
    let timestamp = gw_types::unix_now();
    match outcome {
        Ok((value, _perf)) => json_response(200, &json!({ "chain": chain, "result": value, "timestamp": timestamp })),
        Err((failure, _perf)) => {
            let status = StatusCode::from_u16(failure.kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            json_response(
                status.as_u16(),
                &json!({ "chain": chain, "error": failure.message, "timestamp": timestamp }),
            )
        }
    }
}

pub async fn metrics(server: Arc<Server>, key: ApiKeyRecord, chain: String) -> Result<Response<Body>, GatewayError> {
    let chain = ChainName::resolve(&chain).as_str().to_string();
    if server.backends.get(&chain).is_none() {
        return Err(GatewayError::not_found());
    }
    let relay_state = server
        .backends
        .relay_state_of(&chain)
        .map(|r| format!("{:?}", r.state()))
        .unwrap_or_else(|| "unknown".to_string());
    let circuit_state = server
        .breakers
        .state_of(&chain)
        .map(|s| format!("{s:?}"))
        .unwrap_or_else(|| "unknown".to_string());
    let aggressive = server.cache.is_aggressive(&chain);
    let next_block_eta_secs = server.backends.next_block_eta_secs(&chain);
    // Best-effort: a mempool query failure shouldn't take down the rest of
    // this endpoint's (already-known) state.
    let mempool_size = universal::execute(server.as_ref(), &key, &chain, "mempool_size", Value::Array(vec![]))
        .await
        .ok()
        .and_then(|(value, _)| value.as_u64());

    Ok(json_response(
        200,
        &json!({
            "chain": chain,
            "relay_state": relay_state,
            "circuit_state": circuit_state,
            "cache_aggressive_mode": aggressive,
            "next_block_eta_secs": next_block_eta_secs,
            "mempool_size": mempool_size,
            "timestamp": gw_types::unix_now(),
        }),
    ))
}

/// WebSocket upgrade placeholder for block-subscription streaming
/// (§4.3, §6.1). Quota accounting happens here; the actual message pump is
/// driven after the hyper upgrade completes in `main`'s connection task.
pub fn quota_identifiers(req: &Request<Body>, chain: &str) -> (String, String) {
    let client_ip = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    (client_ip, chain.to_string())
}
