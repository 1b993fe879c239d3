//! # Gateway Configuration
//!
//! Loads the gateway's startup configuration from a TOML file with
//! `GATEWAY_`-prefixed environment variable overrides, following the same
//! `config` + `shellexpand` pattern the teacher's service configuration
//! crate uses (load a base file, layer environment overrides, expand `$VAR`
//! references in path/URL fields).
//!
//! Configuration is read once at startup; reloading is explicitly out of
//! scope (§6.5).

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub chains: HashMap<String, ChainConfig>,
    #[serde(default)]
    pub keystore: KeystoreConfig,
    #[serde(default)]
    pub keys: KeysConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub admin_key: String,
    #[serde(default = "default_health_port")]
    pub health_port: u16,
    #[serde(default)]
    pub enable_cors: bool,
}

fn default_health_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// Upstream endpoints tried in order (§3 `RelayState`).
    pub endpoints: Vec<String>,
    /// WebSocket endpoint for block subscriptions, if the chain supports one.
    pub ws_endpoint: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KeystoreConfig {
    #[serde(default = "default_keystore_dir")]
    pub directory: PathBuf,
}

fn default_keystore_dir() -> PathBuf {
    PathBuf::from("./keystore")
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            directory: default_keystore_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KeysConfig {
    /// Path to the externally-minted API keys JSON file (§4.2). `None`
    /// means only the bootstrap default key is available.
    pub api_keys_file: Option<PathBuf>,
}

impl GatewayConfig {
    /// Load configuration from `path`, layering `GATEWAY_*` environment
    /// variables over it, then expand `$VAR`/`${VAR}` references in string
    /// fields that name paths or URLs.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            );

        let raw = builder.build()?;
        let mut config: GatewayConfig = raw.try_deserialize()?;
        config.expand_env_vars()?;
        Ok(config)
    }

    fn expand_env_vars(&mut self) -> anyhow::Result<()> {
        for chain in self.chains.values_mut() {
            for endpoint in chain.endpoints.iter_mut() {
                *endpoint = shellexpand::env(endpoint)?.to_string();
            }
            if let Some(ws) = &chain.ws_endpoint {
                chain.ws_endpoint = Some(shellexpand::env(ws)?.to_string());
            }
        }
        let dir = self.keystore.directory.to_string_lossy().to_string();
        self.keystore.directory = PathBuf::from(shellexpand::env(&dir)?.to_string());
        Ok(())
    }

    /// The chain marked `is_default = true`, used by the fastpath snapshot
    /// mechanism (§4.6), falling back to the first chain in insertion order.
    pub fn default_chain(&self) -> Option<String> {
        self.chains
            .iter()
            .find(|(_, c)| c.is_default)
            .or_else(|| self.chains.iter().next())
            .map(|(name, _)| name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn loads_base_config_and_expands_chain_endpoints() {
        std::env::set_var("GW_TEST_HOST", "node.internal");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        let mut f = fs::File::create(&path).unwrap();
        write!(
            f,
            r#"
[server]
bind_address = "0.0.0.0"
port = 8545
admin_key = "s3cr3t"

[chains.bitcoin]
endpoints = ["http://$GW_TEST_HOST:8332"]
is_default = true

[chains.ethereum]
endpoints = ["http://localhost:8545"]
"#
        )
        .unwrap();

        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 8545);
        assert_eq!(
            config.chains["bitcoin"].endpoints[0],
            "http://node.internal:8332"
        );
        assert_eq!(config.default_chain().as_deref(), Some("bitcoin"));
    }
}
