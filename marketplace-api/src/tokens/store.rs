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

//! Provider-token persistence, encrypted before it reaches storage.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::cipher::TokenCipher;
use crate::oauth::{AuthError, Provider, ProviderToken};

/// Token persistence keyed by (user, provider).
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Replace whatever is stored for the pair.
    async fn put(
        &self,
        user_id: &str,
        provider: Provider,
        token: &ProviderToken,
    ) -> Result<(), AuthError>;

    async fn get(&self, user_id: &str, provider: Provider)
        -> Result<Option<ProviderToken>, AuthError>;
}

/// Raw storage of already-sealed token blobs.
#[async_trait]
pub trait TokenBackend: Send + Sync {
    async fn put_sealed(
        &self,
        user_id: &str,
        provider: Provider,
        sealed: String,
    ) -> Result<(), AuthError>;

    async fn get_sealed(&self, user_id: &str, provider: Provider)
        -> Result<Option<String>, AuthError>;
}

/// [`TokenStore`] that serializes tokens to JSON, seals them with a
/// [`TokenCipher`] and stores the base64 result in a [`TokenBackend`].
pub struct EncryptedTokenStore<B> {
    backend: B,
    cipher: Arc<dyn TokenCipher>,
}

impl<B: TokenBackend> EncryptedTokenStore<B> {
    pub fn new(backend: B, cipher: Arc<dyn TokenCipher>) -> Self {
        Self { backend, cipher }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn seal(&self, token: &ProviderToken) -> Result<String, AuthError> {
        let plaintext = serde_json::to_vec(token).map_err(AuthError::storage)?;
        let sealed = self.cipher.encrypt(&plaintext)?;
        Ok(STANDARD.encode(sealed))
    }

    fn unseal(&self, sealed: &str) -> Result<ProviderToken, AuthError> {
        let bytes = STANDARD.decode(sealed).map_err(AuthError::storage)?;
        let plaintext = self.cipher.decrypt(&bytes)?;
        serde_json::from_slice(&plaintext).map_err(AuthError::storage)
    }
}

#[async_trait]
impl<B: TokenBackend> TokenStore for EncryptedTokenStore<B> {
    async fn put(
        &self,
        user_id: &str,
        provider: Provider,
        token: &ProviderToken,
    ) -> Result<(), AuthError> {
        let sealed = self.seal(token)?;
        self.backend.put_sealed(user_id, provider, sealed).await
    }

    async fn get(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<ProviderToken>, AuthError> {
        match self.backend.get_sealed(user_id, provider).await? {
            Some(sealed) => self.unseal(&sealed).map(Some),
            None => Ok(None),
        }
    }
}
