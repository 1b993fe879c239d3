//! `GET /v1/{chain}/stream` WebSocket upgrade (§4.3, §6.1). Quota is
//! acquired before the upgrade completes and released when the connection
//! task ends, regardless of how it ends -- the `WsQuotaGuard` lives inside
//! the spawned task's stack frame.

use futures_util::{SinkExt, StreamExt};
use gw_ratelimit::{ApiKeyRecord, WsQuotaGuard};
use gw_types::ChainName;
use hyper::upgrade::Upgraded;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::GatewayError;
use crate::server::Server;

const BLOCK_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// A connection idle this long without a client frame is closed (§4.8).
const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
/// A single outgoing frame has this long to flush before the connection
/// is considered stalled and closed (§4.8).
const WRITE_DEADLINE: Duration = Duration::from_secs(5);

pub async fn upgrade(
    server: Arc<Server>,
    key: ApiKeyRecord,
    chain: String,
    client_ip: String,
    mut req: Request<Body>,
) -> Result<Response<Body>, GatewayError> {
    let chain = ChainName::resolve(&chain).as_str().to_string();
    if server.backends.get(&chain).is_none() {
        return Err(GatewayError::not_found());
    }

    let budgets = key.tier.budgets();
    let guard = server
        .ws_quota
        .try_acquire(&client_ip, &chain, budgets.ws_per_ip_cap as u64, budgets.ws_per_chain_cap as u64)
        .ok_or_else(GatewayError::quota_exceeded)?;

    if !hyper_tungstenite_is_upgrade(&req) {
        return Err(GatewayError::bad_request("expected a WebSocket upgrade request"));
    }

    let response = Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header("connection", "upgrade")
        .header("upgrade", "websocket")
        .body(Body::empty())
        .map_err(|e| GatewayError::encoding_error(e.to_string()))?;

    tokio::spawn(async move {
        match hyper::upgrade::on(&mut req).await {
            Ok(upgraded) => {
                let ws_stream =
                    WebSocketStream::from_raw_socket(upgraded, tokio_tungstenite::tungstenite::protocol::Role::Server, None)
                        .await;
                drive_connection(server, chain, ws_stream, guard).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "websocket upgrade failed");
            }
        }
    });

    Ok(response)
}

fn hyper_tungstenite_is_upgrade(req: &Request<Body>) -> bool {
    req.headers()
        .get("upgrade")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Subscribe to `chain`'s block arrivals and push each one to the client
/// until it disconnects, sends a close frame, or goes idle past
/// `READ_IDLE_TIMEOUT`. `_guard` is held for the lifetime of this future so
/// the quota is released exactly once, on task exit.
async fn drive_connection(
    server: Arc<Server>,
    chain: String,
    ws_stream: WebSocketStream<Upgraded>,
    _guard: WsQuotaGuard,
) {
    let Some(backend) = server.backends.get(&chain) else {
        return;
    };
    let (mut sink, mut source) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<serde_json::Value>(16);
    let subscriber = backend.clone();
    tokio::spawn(async move {
        subscriber.stream_blocks(tx, BLOCK_POLL_INTERVAL).await;
    });

    let read_deadline = tokio::time::sleep(READ_IDLE_TIMEOUT);
    tokio::pin!(read_deadline);

    loop {
        tokio::select! {
            _ = &mut read_deadline => {
                tracing::debug!(chain = %chain, "websocket idle timeout, closing");
                break;
            }
            block = rx.recv() => {
                let Some(block) = block else { break };
                let payload = json!({ "chain": chain, "block": block }).to_string();
                if tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Text(payload))).await.is_err() {
                    tracing::debug!(chain = %chain, "websocket write deadline exceeded, closing");
                    break;
                }
            }
            incoming = source.next() => {
                read_deadline.as_mut().reset(tokio::time::Instant::now() + READ_IDLE_TIMEOUT);
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(payload))) => {
                        if tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Pong(payload))).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(chain = %chain, error = %e, "websocket read error, closing");
                        break;
                    }
                }
            }
        }
    }
}
