//! API key registry (§4.2, §3 `ApiKey`).
//!
//! Keys are stored only as their digest; the raw key exists transiently
//! during `validate_key`/`generate_key` and is never persisted.

use dashmap::DashMap;
use gw_types::{RandomSource, Tier};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type KeyDigest = [u8; 32];

pub fn digest_key(raw: &str) -> KeyDigest {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    let out = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&out);
    digest
}

#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub hash: KeyDigest,
    pub tier: Tier,
    pub created_at: u64,
    pub expires_at: u64,
    pub last_used: u64,
    pub request_count: u64,
    pub rate_remaining: u64,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ApiKeyRecord {
    pub fn is_valid_at(&self, now: u64) -> bool {
        now <= self.expires_at
    }
}

/// Schema for the externally-minted keys JSON file (§4.2).
#[derive(Debug, Deserialize)]
struct ExternalKeyEntry {
    key: String,
    tier: String,
    created_at: u64,
    expires_at: u64,
    #[serde(default)]
    requests: u64,
    #[serde(default)]
    revoked: bool,
}

pub struct ApiKeyRegistry {
    keys: DashMap<KeyDigest, ApiKeyRecord>,
    random: Arc<dyn RandomSource>,
    next_keygen_seq: AtomicU64,
}

/// Fixed bootstrap key so a freshly-started gateway is usable without an
/// external key file (§4.2). Not intended for production use.
pub const BOOTSTRAP_KEY: &str = "bootstrap-default-free-tier-key";

impl ApiKeyRegistry {
    pub fn new(random: Arc<dyn RandomSource>, now: u64) -> Self {
        let registry = Self {
            keys: DashMap::new(),
            random,
            next_keygen_seq: AtomicU64::new(0),
        };
        registry.insert_bootstrap_key(now);
        registry
    }

    fn insert_bootstrap_key(&self, now: u64) {
        let tier = Tier::Free;
        self.keys.insert(
            digest_key(BOOTSTRAP_KEY),
            ApiKeyRecord {
                hash: digest_key(BOOTSTRAP_KEY),
                tier,
                created_at: now,
                expires_at: u64::MAX,
                last_used: 0,
                request_count: 0,
                rate_remaining: tier.budgets().hourly_requests as u64,
                client_ip: None,
                user_agent: None,
            },
        );
    }

    /// Load externally-minted keys from the shared JSON file (§4.2).
    /// Revoked or expired entries are skipped; unknown tiers degrade to
    /// `Free` rather than rejecting the record.
    pub fn load_from_file(&self, path: impl AsRef<Path>, now: u64) -> anyhow::Result<usize> {
        let contents = std::fs::read_to_string(path)?;
        let entries: Vec<ExternalKeyEntry> = serde_json::from_str(&contents)?;
        let mut loaded = 0;
        for entry in entries {
            if entry.revoked || entry.expires_at <= now {
                continue;
            }
            let tier = Tier::from_str_lenient(&entry.tier);
            let hash = digest_key(&entry.key);
            self.keys.insert(
                hash,
                ApiKeyRecord {
                    hash,
                    tier,
                    created_at: entry.created_at,
                    expires_at: entry.expires_at,
                    last_used: 0,
                    request_count: entry.requests,
                    rate_remaining: tier.budgets().hourly_requests as u64,
                    client_ip: None,
                    user_agent: None,
                },
            );
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Return the key's record iff present and unexpired. Comparison is on
    /// the digest, never the raw key (§4.1).
    pub fn validate_key(&self, raw_key: &str, now: u64) -> Option<ApiKeyRecord> {
        let hash = digest_key(raw_key);
        let record = self.keys.get(&hash)?;
        if record.is_valid_at(now) {
            Some(record.clone())
        } else {
            None
        }
    }

    pub fn update_usage(&self, raw_key: &str, client_ip: &str, user_agent: &str, now: u64) {
        let hash = digest_key(raw_key);
        if let Some(mut record) = self.keys.get_mut(&hash) {
            record.last_used = now;
            record.request_count += 1;
            record.rate_remaining = record.rate_remaining.saturating_sub(1);
            record.client_ip = Some(client_ip.to_string());
            record.user_agent = Some(user_agent.to_string());
        }
    }

    /// Generate a fresh Free-tier key: 32 random bytes, hex-encoded. Returns
    /// the raw key once; only the digest is stored (§4.2).
    pub fn generate_key(&self, now: u64) -> String {
        let mut bytes = [0u8; 32];
        self.random.fill_bytes(&mut bytes);
        self.next_keygen_seq.fetch_add(1, Ordering::Relaxed);
        let raw = hex::encode(bytes);
        let tier = Tier::Free;
        self.keys.insert(
            digest_key(&raw),
            ApiKeyRecord {
                hash: digest_key(&raw),
                tier,
                created_at: now,
                expires_at: now + 365 * 24 * 3600,
                last_used: 0,
                request_count: 0,
                rate_remaining: tier.budgets().hourly_requests as u64,
                client_ip: None,
                user_agent: None,
            },
        );
        raw
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_types::OsRandom;

    #[test]
    fn bootstrap_key_validates() {
        let registry = ApiKeyRegistry::new(Arc::new(OsRandom), 1000);
        let record = registry.validate_key(BOOTSTRAP_KEY, 1000).unwrap();
        assert_eq!(record.tier, Tier::Free);
    }

    #[test]
    fn generated_keys_are_unique_and_validate() {
        let registry = ApiKeyRegistry::new(Arc::new(OsRandom), 1000);
        let a = registry.generate_key(1000);
        let b = registry.generate_key(1000);
        assert_ne!(a, b);
        assert!(registry.validate_key(&a, 1000).is_some());
        assert!(registry.validate_key(&b, 1000).is_some());
    }

    #[test]
    fn expired_key_fails_validation() {
        let registry = ApiKeyRegistry::new(Arc::new(OsRandom), 1000);
        let raw = "some-raw-key";
        registry.keys.insert(
            digest_key(raw),
            ApiKeyRecord {
                hash: digest_key(raw),
                tier: Tier::Pro,
                created_at: 0,
                expires_at: 500,
                last_used: 0,
                request_count: 0,
                rate_remaining: 1000,
                client_ip: None,
                user_agent: None,
            },
        );
        assert!(registry.validate_key(raw, 1000).is_none());
    }

    #[test]
    fn unknown_tier_string_degrades_to_free() {
        let registry = ApiKeyRegistry::new(Arc::new(OsRandom), 0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(
            &path,
            r#"[{"key":"abc","tier":"platinum","created_at":0,"expires_at":999999,"requests":0,"revoked":false}]"#,
        )
        .unwrap();
        registry.load_from_file(&path, 0).unwrap();
        let record = registry.validate_key("abc", 0).unwrap();
        assert_eq!(record.tier, Tier::Free);
    }

    #[test]
    fn revoked_and_expired_entries_are_skipped() {
        let registry = ApiKeyRegistry::new(Arc::new(OsRandom), 0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(
            &path,
            r#"[
                {"key":"revoked","tier":"pro","created_at":0,"expires_at":999999,"requests":0,"revoked":true},
                {"key":"expired","tier":"pro","created_at":0,"expires_at":1,"requests":0,"revoked":false}
            ]"#,
        )
        .unwrap();
        let loaded = registry.load_from_file(&path, 100).unwrap();
        assert_eq!(loaded, 0);
        assert!(registry.validate_key("revoked", 100).is_none());
        assert!(registry.validate_key("expired", 100).is_none());
    }
}
