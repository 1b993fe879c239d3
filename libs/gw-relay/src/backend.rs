//! The chain backend contract and a concrete JSON-RPC-over-HTTP
//! implementation (§3 `ChainBackend`, §4.7).

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::Sender;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned an RPC error: {0}")]
    RpcError(String),
}

#[async_trait]
pub trait ChainBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Invoke `method` with `params`, bounded by `timeout`. Implementations
    /// own endpoint selection among their configured candidates.
    async fn call(&self, method: &str, params: Value, timeout: Duration)
        -> Result<Value, BackendError>;

    /// Subscribe to this chain's block arrivals, forwarding each newly
    /// observed block through `sink` until it's dropped (§3 `BackendHandle`
    /// `stream_blocks`, §4.8). The default implementation polls
    /// `latest_block` on `poll_interval` and forwards only height changes;
    /// a backend with a native push transport can override this.
    async fn stream_blocks(&self, sink: Sender<Value>, poll_interval: Duration) {
        let mut last_height: Option<u64> = None;
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            let Ok(value) = self.call("latest_block", Value::Array(vec![]), poll_interval).await else {
                continue;
            };
            let height = value
                .as_u64()
                .or_else(|| value.as_object().and_then(|o| o.get("height")).and_then(Value::as_u64));
            if height.is_some() && height == last_height {
                continue;
            }
            last_height = height;
            if sink.send(value).await.is_err() {
                return;
            }
        }
    }
}

/// A JSON-RPC backend speaking to an ordered list of HTTP endpoints. The
/// first endpoint is tried first; callers needing failover iterate
/// `endpoints()` themselves (probe logic does, for `Connecting -> Connected`).
pub struct JsonRpcBackend {
    name: String,
    endpoints: Vec<String>,
    client: reqwest::Client,
}

impl JsonRpcBackend {
    pub fn new(name: impl Into<String>, endpoints: Vec<String>) -> Self {
        Self {
            name: name.into(),
            endpoints,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn call_endpoint(
        &self,
        endpoint: &str,
        method: &str,
        params: &Value,
        timeout: Duration,
    ) -> Result<Value, BackendError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = tokio::time::timeout(
            timeout,
            self.client.post(endpoint).json(&body).send(),
        )
        .await
        .map_err(|_| BackendError::Timeout(timeout))?
        .map_err(|e| BackendError::Transport(e.to_string()))?;

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if let Some(error) = parsed.get("error") {
            return Err(BackendError::RpcError(error.to_string()));
        }
        Ok(parsed.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ChainBackend for JsonRpcBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, BackendError> {
        let mut last_err = BackendError::Transport("no endpoints configured".to_string());
        for endpoint in &self.endpoints {
            match self.call_endpoint(endpoint, method, &params, timeout).await {
                Ok(value) => return Ok(value),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }
}
