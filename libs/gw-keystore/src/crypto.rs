//! scrypt key derivation + AES-GCM encryption for keystore entries.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use scrypt::Params;

use crate::error::KeystoreError;
use crate::schema::KdfParams;

pub fn derive_key(password: &str, kdf: &KdfParams) -> Result<[u8; 32], KeystoreError> {
    let params = Params::new(kdf.n, kdf.r, kdf.p, kdf.dklen)
        .map_err(|e| KeystoreError::Crypto(e.to_string()))?;
    let mut output = [0u8; 32];
    scrypt::scrypt(password.as_bytes(), &kdf.salt, &params, &mut output)
        .map_err(|e| KeystoreError::Crypto(e.to_string()))?;
    Ok(output)
}

pub fn encrypt(key: &[u8; 32], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, KeystoreError> {
    let cipher = Aes256Gcm::new(key.into());
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| KeystoreError::Crypto(e.to_string()))
}

pub fn decrypt(key: &[u8; 32], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, KeystoreError> {
    let cipher = Aes256Gcm::new(key.into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| KeystoreError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let kdf = KdfParams::generate(vec![1; 16]);
        let key = derive_key("correct horse", &kdf).unwrap();
        let nonce = [7u8; 12];
        let ciphertext = encrypt(&key, &nonce, b"hello world").unwrap();
        let plaintext = decrypt(&key, &nonce, &ciphertext).unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[test]
    fn wrong_password_fails_authentication() {
        let kdf = KdfParams::generate(vec![1; 16]);
        let key = derive_key("right", &kdf).unwrap();
        let nonce = [7u8; 12];
        let ciphertext = encrypt(&key, &nonce, b"secret").unwrap();

        let wrong_key = derive_key("wrong", &kdf).unwrap();
        assert!(decrypt(&wrong_key, &nonce, &ciphertext).is_err());
    }
}
