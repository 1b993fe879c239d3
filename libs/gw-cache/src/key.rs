//! Cache key derivation: `sha256(chain || method || canonical(params))` (§4.5).

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonicalize::canonicalize;

pub fn cache_key(chain: &str, method: &str, params: &Value) -> String {
    let canon = canonicalize(params);
    let mut hasher = Sha256::new();
    hasher.update(chain.as_bytes());
    hasher.update(b"\0");
    hasher.update(method.as_bytes());
    hasher.update(b"\0");
    hasher.update(serde_json::to_vec(&canon).unwrap_or_default());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_stable_under_param_field_reordering() {
        let a = cache_key("ethereum", "eth_call", &json!({"to": "0x1", "data": "0x2"}));
        let b = cache_key("ethereum", "eth_call", &json!({"data": "0x2", "to": "0x1"}));
        assert_eq!(a, b);
    }

    #[test]
    fn different_chains_produce_different_keys() {
        let a = cache_key("ethereum", "eth_call", &json!({}));
        let b = cache_key("bitcoin", "eth_call", &json!({}));
        assert_ne!(a, b);
    }
}
