//! Minimal entropy source contract for keystore salts and nonces.
//!
//! The secure-buffer/entropy FFI library this would normally bridge to is
//! out of scope; this crate only needs its interface, satisfied here by
//! delegating to [`gw_types::RandomSource`].

use gw_types::RandomSource;

pub trait SecureEntropy: Send + Sync {
    fn random_bytes(&self, len: usize) -> Vec<u8>;
}

pub struct DefaultEntropy<R: RandomSource> {
    source: R,
}

impl<R: RandomSource> DefaultEntropy<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }
}

impl<R: RandomSource> SecureEntropy for DefaultEntropy<R> {
    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.source.fill_bytes(&mut buf);
        buf
    }
}
