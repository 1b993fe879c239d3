//! Canonical chain identifiers with alias resolution (§3 `ChainName`).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainName(String);

impl ChainName {
    /// Resolve a user-supplied path segment or config key to its canonical
    /// lowercase name, following known aliases (`btc` -> `bitcoin`, ...).
    pub fn resolve(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        let canonical = match lower.as_str() {
            "btc" => "bitcoin",
            "eth" => "ethereum",
            "sol" => "solana",
            other => other,
        };
        ChainName(canonical.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainName {
    fn from(s: &str) -> Self {
        ChainName::resolve(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_name() {
        assert_eq!(ChainName::resolve("BTC").as_str(), "bitcoin");
        assert_eq!(ChainName::resolve("eth").as_str(), "ethereum");
        assert_eq!(ChainName::resolve("Bitcoin").as_str(), "bitcoin");
    }
}
