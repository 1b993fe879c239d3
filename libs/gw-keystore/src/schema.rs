//! On-disk keystore entry schema (§6.4): `{id, created_at, cipher,
//! kdf:{salt,n,r,p,dklen}, nonce, ciphertext}`, binary fields base64.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfParams {
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    pub n: u32,
    pub r: u32,
    pub p: u32,
    pub dklen: usize,
}

/// Defaults chosen for an interactive admin workflow, not bulk key
/// derivation: scrypt N=2^14, r=8, p=1, 32-byte derived key.
impl KdfParams {
    pub fn generate(salt: Vec<u8>) -> Self {
        Self {
            salt,
            n: 14,
            r: 8,
            p: 1,
            dklen: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreEntry {
    pub id: String,
    pub created_at: u64,
    pub cipher: String,
    pub kdf: KdfParams,
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

impl KeystoreEntry {
    pub const CIPHER_NAME: &'static str = "AES-GCM";
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_through_json() {
        let entry = KeystoreEntry {
            id: "k1".to_string(),
            created_at: 100,
            cipher: KeystoreEntry::CIPHER_NAME.to_string(),
            kdf: KdfParams::generate(vec![1, 2, 3, 4]),
            nonce: vec![5, 6, 7],
            ciphertext: vec![9, 9, 9],
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: KeystoreEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "k1");
        assert_eq!(back.kdf.salt, vec![1, 2, 3, 4]);
        assert_eq!(back.ciphertext, vec![9, 9, 9]);
    }
}
