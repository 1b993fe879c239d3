//! Keystore CRUD (§4, §6.4). Saves write to a temp file in the same
//! directory and rename into place, so a crash mid-write never leaves a
//! partial entry at the real path. Entry files are `0600`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::crypto::{decrypt, derive_key, encrypt};
use crate::entropy::SecureEntropy;
use crate::error::KeystoreError;
use crate::schema::{KdfParams, KeystoreEntry};

pub struct KeystoreManager {
    directory: PathBuf,
    entropy: Arc<dyn SecureEntropy>,
}

impl KeystoreManager {
    pub fn new(directory: impl Into<PathBuf>, entropy: Arc<dyn SecureEntropy>) -> Self {
        Self {
            directory: directory.into(),
            entropy,
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.directory.join(format!("{id}.keystore"))
    }

    pub fn save(&self, id: &str, password: &str, data: &[u8], now: u64) -> Result<(), KeystoreError> {
        std::fs::create_dir_all(&self.directory)?;

        let salt = self.entropy.random_bytes(16);
        let kdf = KdfParams::generate(salt);
        let key = derive_key(password, &kdf)?;
        let nonce = self.entropy.random_bytes(12);
        let ciphertext = encrypt(&key, &nonce, data)?;

        let entry = KeystoreEntry {
            id: id.to_string(),
            created_at: now,
            cipher: KeystoreEntry::CIPHER_NAME.to_string(),
            kdf,
            nonce,
            ciphertext,
        };

        self.write_entry_atomically(id, &entry)
    }

    /// Import a verbatim already-encrypted blob -- used by the admin
    /// import endpoint, which receives a full [`KeystoreEntry`] JSON
    /// document rather than plaintext plus a password.
    pub fn import(&self, id: &str, raw: &[u8]) -> Result<(), KeystoreError> {
        std::fs::create_dir_all(&self.directory)?;
        let entry: KeystoreEntry = serde_json::from_slice(raw)
            .map_err(|e| KeystoreError::Malformed(e.to_string()))?;
        self.write_entry_atomically(id, &entry)
    }

    fn write_entry_atomically(&self, id: &str, entry: &KeystoreEntry) -> Result<(), KeystoreError> {
        let final_path = self.path_for(id);
        let tmp_path = self.directory.join(format!("{id}.keystore.tmp"));
        let json = serde_json::to_vec_pretty(entry)
            .map_err(|e| KeystoreError::Malformed(e.to_string()))?;

        std::fs::write(&tmp_path, &json)?;
        set_owner_only_permissions(&tmp_path)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    pub fn load(&self, id: &str, password: &str) -> Result<Vec<u8>, KeystoreError> {
        let entry = self.read_entry(id)?;
        let key = derive_key(password, &entry.kdf)?;
        decrypt(&key, &entry.nonce, &entry.ciphertext)
    }

    fn read_entry(&self, id: &str) -> Result<KeystoreEntry, KeystoreError> {
        let path = self.path_for(id);
        let bytes = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KeystoreError::NotFound
            } else {
                KeystoreError::Io(e)
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| KeystoreError::Malformed(e.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<(), KeystoreError> {
        let path = self.path_for(id);
        std::fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KeystoreError::NotFound
            } else {
                KeystoreError::Io(e)
            }
        })
    }

    pub fn list(&self) -> Result<Vec<String>, KeystoreError> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.directory)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(id) = name.strip_suffix(".keystore") {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::DefaultEntropy;
    use gw_types::OsRandom;

    fn manager(dir: &Path) -> KeystoreManager {
        KeystoreManager::new(dir, Arc::new(DefaultEntropy::new(OsRandom)))
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = manager(dir.path());
        keystore.save("k1", "pw", b"hello", 1000).unwrap();
        let data = keystore.load("k1", "pw").unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn wrong_password_returns_authentication_error() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = manager(dir.path());
        keystore.save("k1", "pw", b"hello", 1000).unwrap();
        let err = keystore.load("k1", "wrong").unwrap_err();
        assert!(matches!(err, KeystoreError::AuthenticationFailed));
    }

    #[test]
    fn delete_then_load_returns_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = manager(dir.path());
        keystore.save("k1", "pw", b"hello", 1000).unwrap();
        keystore.delete("k1").unwrap();
        let err = keystore.load("k1", "pw").unwrap_err();
        assert!(matches!(err, KeystoreError::NotFound));
    }

    #[test]
    fn list_reflects_saved_entries() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = manager(dir.path());
        keystore.save("b", "pw", b"1", 1000).unwrap();
        keystore.save("a", "pw", b"2", 1000).unwrap();
        assert_eq!(keystore.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_has_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let keystore = manager(dir.path());
        keystore.save("k1", "pw", b"hello", 1000).unwrap();
        let meta = std::fs::metadata(dir.path().join("k1.keystore")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}
