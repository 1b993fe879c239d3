//! The unified verb dispatcher behind `/api/v1/universal/{chain}/{method}`
//! (§4.8), plus the shared execution core (`execute`) reused by the direct
//! per-chain endpoints in `handlers::chain`. Every request passes through:
//! admission (rate limit), circuit breaker check, cache lookup/fetch, then
//! response encoding. The universal dispatcher always answers `200` and
//! folds backend-side failures into the envelope's `error` field (§4.8 step
//! 5, §7); direct endpoints instead surface `execute`'s `ErrorKind` as a
//! real HTTP status.

use bytes::Bytes;
use gw_ratelimit::ApiKeyRecord;
use gw_types::{ChainName, ErrorKind, Performance, ResponseEnvelope};
use hyper::{Body, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::handlers::health::json_response;
use crate::server::Server;

/// Canonical methods recognized by the universal dispatcher, with their
/// accepted aliases (§4.8). `mempool_size` is deliberately absent here: it's
/// only reachable through the direct `/v1/{chain}/metrics` endpoint.
pub fn canonical_method(method: &str) -> Option<&'static str> {
    match method {
        "ping" => Some("ping"),
        "latest" | "latest_block" => Some("latest_block"),
        "status" | "network_info" => Some("network_info"),
        "peers" | "peer_count" => Some("peer_count"),
        "sync" | "sync_status" => Some("sync_status"),
        _ => None,
    }
}

/// Best-effort block height extraction from a backend's raw JSON-RPC
/// result, for the §4.9 arrival recorder. No upstream schema is assumed
/// beyond a handful of common field names; chains whose `latest_block`
/// payload doesn't match any of them simply aren't recorded.
fn extract_block_height(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let obj = value.as_object()?;
    for field in ["height", "number", "block_number", "blockHeight"] {
        if let Some(n) = obj.get(field).and_then(Value::as_u64) {
            return Some(n);
        }
        if let Some(s) = obj.get(field).and_then(Value::as_str) {
            if let Some(hex) = s.strip_prefix("0x") {
                if let Ok(n) = u64::from_str_radix(hex, 16) {
                    return Some(n);
                }
            } else if let Ok(n) = s.parse::<u64>() {
                return Some(n);
            }
        }
    }
    None
}

/// A failure from `execute`, carrying the `ErrorKind` a direct endpoint
/// should answer with (§6.3, §7) alongside a human-readable message.
pub struct CoreFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Run one backend verb through admission, the circuit breaker, and the
/// cache, returning either the decoded result or a `CoreFailure` -- in
/// both cases paired with the request's `Performance` reading. `method`
/// must already be canonical; callers resolve aliases themselves (§4.8).
pub async fn execute(
    server: &Server,
    key: &ApiKeyRecord,
    chain: &str,
    method: &str,
    params: Value,
) -> Result<(Value, Performance), (CoreFailure, Performance)> {
    let budgets = key.tier.budgets();
    let key_id = hex::encode(key.hash);
    let started = server.clock.now_nanos();
    let perf_now = |elapsed| Performance::new(elapsed, budgets.latency_target_ms);

    if !server
        .rate_limiter
        .allow(&key_id, budgets.hourly_requests as f64, budgets.refill_per_sec)
    {
        let perf = perf_now(elapsed_ms(server, started));
        return Err((
            CoreFailure {
                kind: ErrorKind::QuotaExceeded,
                message: "rate limit exceeded".to_string(),
            },
            perf,
        ));
    }

    if method == "ping" {
        let perf = perf_now(elapsed_ms(server, started));
        return Ok((Value::String("pong".to_string()), perf));
    }

    let Some(backend) = server.backends.get(chain) else {
        let perf = perf_now(elapsed_ms(server, started));
        return Err((
            CoreFailure {
                kind: ErrorKind::NotFound,
                message: "unknown chain".to_string(),
            },
            perf,
        ));
    };

    let breaker = server.breakers.get_or_create(chain, key.tier.breaker_params());
    if !breaker.allow_call() {
        // Free drops rejected calls outright; higher tiers get one queued
        // retry after a short wait before giving up (§4.4 `should_queue`).
        let retried = gw_breaker::should_queue(key.tier) && {
            tokio::time::sleep(Duration::from_millis(50)).await;
            breaker.allow_call()
        };
        if !retried {
            server
                .cache
                .record_latency(chain, budgets.latency_target_ms + 1, budgets.latency_target_ms);
            let perf = perf_now(elapsed_ms(server, started));
            return Err((
                CoreFailure {
                    kind: ErrorKind::BackendUnavailable,
                    message: "backend unavailable".to_string(),
                },
                perf,
            ));
        }
    }

    let cache_key = server.cache.key_for(chain, method, &params);
    let fetch_params = params.clone();
    let fetch_backend = backend.clone();
    let fetch_method = method.to_string();
    let deadline = Duration::from_millis(budgets.latency_target_ms * 3);

    let result = server
        .cache
        .get_or_fetch(chain, &cache_key, budgets.cache_min_ttl, budgets.cache_max_ttl, || async move {
            fetch_backend
                .call(&fetch_method, fetch_params, deadline)
                .await
                .map(|value| Bytes::from(value.to_string()))
                .map_err(|e| Arc::from(e.to_string()))
        })
        .await;

    let elapsed = elapsed_ms(server, started);
    server.cache.record_latency(chain, elapsed, budgets.latency_target_ms);
    let perf = perf_now(elapsed);

    match result {
        Ok(bytes) => {
            breaker.record_success();
            let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            if method == "latest_block" {
                if let Some(height) = extract_block_height(&value) {
                    server
                        .backends
                        .record_block_height(chain, height, bytes.len() as u64, gw_types::unix_now());
                }
            }
            Ok((value, perf))
        }
        Err(err) => {
            breaker.record_failure();
            Err((
                CoreFailure {
                    kind: ErrorKind::BackendUnavailable,
                    message: err.to_string(),
                },
                perf,
            ))
        }
    }
}

pub async fn dispatch(
    server: Arc<Server>,
    key: ApiKeyRecord,
    chain: String,
    method: String,
    params: Value,
    _client_ip: String,
) -> Response<Body> {
    let chain = ChainName::resolve(&chain).as_str().to_string();
    let budgets = key.tier.budgets();
    let started = server.clock.now_nanos();

    let Some(canonical) = canonical_method(&method) else {
        let perf = Performance::new(elapsed_ms(server.as_ref(), started), budgets.latency_target_ms);
        return envelope_err(&key, &chain, &method, "unknown method", perf);
    };

    match execute(server.as_ref(), &key, &chain, canonical, params).await {
        Ok((value, perf)) => envelope_ok(&key, &chain, canonical, value, perf),
        Err((failure, perf)) => envelope_err(&key, &chain, canonical, &failure.message, perf),
    }
}

fn elapsed_ms(server: &Server, started: u64) -> u128 {
    ((server.clock.now_nanos().saturating_sub(started)) / 1_000_000) as u128
}

fn envelope_ok(key: &ApiKeyRecord, chain: &str, method: &str, data: Value, perf: Performance) -> Response<Body> {
    write_envelope(
        key,
        ResponseEnvelope::success(chain, method, key.tier.as_str(), gw_types::unix_now(), data, perf),
    )
}

fn envelope_err(key: &ApiKeyRecord, chain: &str, method: &str, error: &str, perf: Performance) -> Response<Body> {
    write_envelope(
        key,
        ResponseEnvelope::failure(chain, method, key.tier.as_str(), gw_types::unix_now(), error, perf),
    )
}

/// Always HTTP 200: the envelope carries success/failure in its body, not
/// in the status line (§4.8). Higher tiers get compact, non-HTML-escaped
/// JSON encoding.
fn write_envelope(key: &ApiKeyRecord, envelope: ResponseEnvelope) -> Response<Body> {
    let body = serde_json::to_value(&envelope).unwrap_or(Value::Null);
    if key.tier.compact_json() {
        Response::builder()
            .status(200)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| Response::new(Body::from("internal error")))
    } else {
        json_response(200, &body)
    }
}
