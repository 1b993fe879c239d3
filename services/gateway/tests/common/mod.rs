//! Shared harness for the gateway's end-to-end tests (§8 scenarios).
//!
//! Builds a real `Server` in-process -- a temp-directory keystore, an
//! otherwise-default config, and the bootstrap Free-tier key -- and drives
//! requests straight through `gateway::router::route`, without binding a
//! socket.

use async_trait::async_trait;
use gateway::server::Server;
use gw_config::{ChainConfig, GatewayConfig, KeysConfig, KeystoreConfig, ServerConfig};
use gw_keystore::{DefaultEntropy, KeystoreManager};
use gw_relay::backend::{BackendError, ChainBackend};
use gw_ratelimit::BOOTSTRAP_KEY;
use gw_types::{OsRandom, RandomSource, Tier};
use hyper::{Body, Request};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const API_KEY: &str = BOOTSTRAP_KEY;

/// Holds the `TempDir` alive for the keystore directory; dropping it
/// cleans up the backing files.
pub struct Harness {
    pub server: Arc<Server>,
    /// The concrete backend double registered for each chain, kept
    /// alongside the registry's own `Arc<dyn ChainBackend>` so tests can
    /// reach its scripting methods without a downcast.
    pub scripted: HashMap<String, Arc<ScriptedBackend>>,
    _keystore_dir: TempDir,
}

impl Harness {
    pub async fn request(&self, req: Request<Body>) -> hyper::Response<Body> {
        gateway::router::route(self.server.clone(), req).await
    }
}

pub fn build(chains: &[&str]) -> Harness {
    let keystore_dir = tempfile::tempdir().expect("tempdir");

    let mut chain_map = HashMap::new();
    for (i, name) in chains.iter().enumerate() {
        chain_map.insert(
            name.to_string(),
            ChainConfig {
                endpoints: vec!["http://127.0.0.1:0".to_string()],
                ws_endpoint: None,
                is_default: i == 0,
            },
        );
    }

    let config = GatewayConfig {
        server: ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            admin_key: "test-admin-key".to_string(),
            health_port: 0,
            enable_cors: false,
        },
        chains: chain_map,
        keystore: KeystoreConfig {
            directory: keystore_dir.path().to_path_buf(),
        },
        keys: KeysConfig { api_keys_file: None },
    };

    let random: Arc<dyn RandomSource> = Arc::new(OsRandom);
    let entropy = Arc::new(DefaultEntropy::new(OsRandom));
    let keystore = Arc::new(KeystoreManager::new(config.keystore.directory.clone(), entropy));

    let server = Arc::new(Server::new(config, random, keystore));
    let mut scripted = HashMap::new();
    for name in chains {
        let backend = Arc::new(ScriptedBackend::new());
        server.backends.register(name, backend.clone(), Tier::Free.breaker_params(), server.clock.clone());
        scripted.insert(name.to_string(), backend);
    }

    Harness { server, scripted, _keystore_dir: keystore_dir }
}

pub fn get(uri: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri.into())
        .header("X-API-Key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

pub fn post(uri: impl Into<String>, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri.into())
        .header("X-API-Key", API_KEY)
        .body(body.into())
        .unwrap()
}

/// A `ChainBackend` double whose response and failure behavior is set by
/// the test. Every call is counted; `call_count()` backs the single-flight
/// assertion in scenario 1.
pub struct ScriptedBackend {
    calls: AtomicU64,
    delay: std::sync::Mutex<Duration>,
    response: std::sync::Mutex<Result<Value, String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            delay: std::sync::Mutex::new(Duration::from_millis(0)),
            response: std::sync::Mutex::new(Ok(serde_json::json!(1))),
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_response(&self, value: Value) {
        *self.response.lock().unwrap() = Ok(value);
    }

    pub fn set_failing(&self) {
        *self.response.lock().unwrap() = Err("upstream down".to_string());
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn call(&self, _method: &str, _params: Value, _timeout: Duration) -> Result<Value, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.response.lock().unwrap().clone() {
            Ok(value) => Ok(value),
            Err(message) => Err(BackendError::Transport(message)),
        }
    }
}
