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

//! In-flight authorization attempts, keyed by their state token.
//!
//! A pending authorization is written when a login starts and taken (deleted)
//! by the first callback that presents its state, whether or not that
//! callback then succeeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::AuthError;
use super::provider::Provider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub state: String,
    pub provider: Provider,
    pub pkce_verifier: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, pending: PendingAuthorization) -> Result<(), AuthError>;

    /// Remove and return the pending authorization for `state`, if any.
    async fn take(&self, state: &str) -> Result<Option<PendingAuthorization>, AuthError>;
}

/// Consume `state` and check it belongs to an unexpired attempt for `provider`.
pub async fn consume_state(
    store: &dyn StateStore,
    state: &str,
    provider: Provider,
    now: DateTime<Utc>,
) -> Result<PendingAuthorization, AuthError> {
    if state.is_empty() {
        return Err(AuthError::InvalidState);
    }

    let pending = store.take(state).await?.ok_or_else(|| {
        tracing::warn!("OAuth2 callback with unknown or reused state for {provider}");
        AuthError::InvalidState
    })?;

    if pending.provider != provider {
        tracing::warn!(
            "OAuth2 state issued for {} presented to {provider} callback",
            pending.provider
        );
        return Err(AuthError::InvalidState);
    }
    if pending.expires_at <= now {
        tracing::warn!("Expired OAuth2 state presented to {provider} callback");
        return Err(AuthError::InvalidState);
    }

    Ok(pending)
}
