/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! AES-256-GCM sealing of provider tokens at rest.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::Aes256Gcm;

use crate::oauth::AuthError;

const NONCE_LEN: usize = 12;

/// Symmetric encryption collaborator used by the token store.
pub trait TokenCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, AuthError>;
    fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, AuthError>;
}

/// AES-256-GCM with a random 96-bit nonce per message, laid out as
/// `nonce || ciphertext+tag`.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    pub fn new(key: &[u8; 32]) -> Self {
        let key: [u8; 32] = *key;
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    /// Parse a 64-character hex key (32 bytes).
    pub fn from_hex(key_hex: &str) -> Result<Self, String> {
        let bytes = hex::decode(key_hex.trim())
            .map_err(|e| format!("TOKEN_ENCRYPTION_KEY is not valid hex: {e}"))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "TOKEN_ENCRYPTION_KEY must be 32 bytes (64 hex characters)".to_string())?;
        Ok(Self::new(&key))
    }
}

impl TokenCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| AuthError::storage(format!("token encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, AuthError> {
        if sealed.len() <= NONCE_LEN {
            return Err(AuthError::storage("sealed token is truncated"));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|e| AuthError::storage(format!("token decryption failed: {e}")))
    }
}
