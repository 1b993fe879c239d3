//! Public, unauthenticated endpoints: `/health`, `/version`, `/status`,
//! `/metrics` (§6.1).

use hyper::{Body, Response};
use serde_json::json;
use std::sync::Arc;

use crate::server::Server;

pub async fn health(server: Arc<Server>) -> Response<Body> {
    let chains: Vec<_> = server
        .backends
        .status_all()
        .into_iter()
        .map(|(chain, state)| json!({ "chain": chain, "state": format!("{state:?}") }))
        .collect();

    let body = json!({
        "status": "ok",
        "uptime_seconds": server.uptime_secs(),
        "chains": chains,
    });
    json_response(200, &body)
}

pub async fn version() -> Response<Body> {
    let body = json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    });
    json_response(200, &body)
}

pub async fn status(server: Arc<Server>) -> Response<Body> {
    let backends: Vec<_> = server
        .backends
        .status_all()
        .into_iter()
        .map(|(chain, state)| {
            json!({
                "chain": chain,
                "state": format!("{state:?}"),
                "circuit": server
                    .breakers
                    .state_of(&chain)
                    .map(|s| format!("{s:?}"))
                    .unwrap_or_else(|| "unknown".to_string()),
            })
        })
        .collect();

    let body = json!({
        "uptime_seconds": server.uptime_secs(),
        "backends": backends,
        "cache_entries": server.cache.len(),
        "api_keys_registered": server.api_keys.len(),
    });
    json_response(200, &body)
}

pub async fn metrics(server: Arc<Server>) -> Response<Body> {
    let mut out = String::new();
    out.push_str("# HELP gateway_cache_hits_total Cache hits since start\n");
    out.push_str("# TYPE gateway_cache_hits_total counter\n");
    out.push_str(&format!("gateway_cache_hits_total {}\n", server.cache.hits()));
    out.push_str("# HELP gateway_cache_misses_total Cache misses since start\n");
    out.push_str("# TYPE gateway_cache_misses_total counter\n");
    out.push_str(&format!("gateway_cache_misses_total {}\n", server.cache.misses()));
    out.push_str("# HELP gateway_cache_entries Current cache size\n");
    out.push_str("# TYPE gateway_cache_entries gauge\n");
    out.push_str(&format!("gateway_cache_entries {}\n", server.cache.len()));
    out.push_str("# HELP gateway_fastpath_hits_total Fastpath snapshot loads\n");
    out.push_str("# TYPE gateway_fastpath_hits_total counter\n");
    out.push_str(&format!(
        "gateway_fastpath_hits_total{{endpoint=\"latest\"}} {}\n",
        server.fastpath_latest.hit_count()
    ));
    out.push_str(&format!(
        "gateway_fastpath_hits_total{{endpoint=\"status\"}} {}\n",
        server.fastpath_status.hit_count()
    ));
    out.push_str("# HELP gateway_uptime_seconds Process uptime\n");
    out.push_str("# TYPE gateway_uptime_seconds gauge\n");
    out.push_str(&format!("gateway_uptime_seconds {}\n", server.uptime_secs()));

    Response::builder()
        .status(200)
        .header("content-type", "text/plain; version=0.0.4")
        .body(Body::from(out))
        .unwrap()
}

pub fn json_response(status: u16, body: &serde_json::Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(Body::from("internal error")))
}
