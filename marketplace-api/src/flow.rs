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

//! The login flow: begin (authorization URL + pending state) and complete
//! (state check → code exchange → profile → reconcile → token store).
//!
//! The completion steps run strictly in order; each consumes the previous
//! step's output. Nothing is written before the provider responses are fully
//! parsed, so dropping the future part-way leaves no partial state behind
//! (apart from the consumed state token, which is single-use anyway).

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::db::users::{LocalUser, UserRepository};
use crate::oauth::authorize::is_acceptable_state;
use crate::oauth::{
    begin_auth, begin_auth_with_state, consume_state, AuthError, AuthorizationRequest,
    PendingAuthorization, Provider, ProviderClient, ProviderToken, StateStore,
};
use crate::reconcile::reconcile;
use crate::tokens::TokenStore;

/// Default lifetime of a pending authorization.
pub const DEFAULT_STATE_TTL_SECS: i64 = 600;

/// Result of a completed login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: LocalUser,
    pub token: ProviderToken,
    /// False when the token could not be persisted; the login still succeeded.
    pub token_stored: bool,
}

pub struct IdentityFlow {
    client: ProviderClient,
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenStore>,
    pending: Arc<dyn StateStore>,
    state_ttl: Duration,
}

impl IdentityFlow {
    pub fn new(
        client: ProviderClient,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenStore>,
        pending: Arc<dyn StateStore>,
        state_ttl: Duration,
    ) -> Self {
        Self {
            client,
            users,
            tokens,
            pending,
            state_ttl,
        }
    }

    /// Build the authorization URL and remember the state for the callback.
    ///
    /// A caller-supplied state is used only if [`is_acceptable_state`] holds;
    /// otherwise a fresh one is generated.
    pub async fn begin_login(
        &self,
        provider: Provider,
        requested_state: Option<&str>,
    ) -> Result<AuthorizationRequest, AuthError> {
        let registry = self.client.registry();
        let request = match requested_state.filter(|s| is_acceptable_state(s)) {
            Some(state) => begin_auth_with_state(registry, provider, state.to_string())?,
            None => begin_auth(registry, provider)?,
        };

        self.pending
            .save(PendingAuthorization {
                state: request.state.clone(),
                provider,
                pkce_verifier: request.pkce_verifier.clone(),
                expires_at: Utc::now() + self.state_ttl,
            })
            .await?;

        tracing::debug!("Started {provider} login");
        Ok(request)
    }

    /// Finish a login started by [`begin_login`](Self::begin_login).
    pub async fn complete_login(
        &self,
        provider: Provider,
        code: &str,
        state: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let pending = consume_state(self.pending.as_ref(), state, provider, Utc::now()).await?;

        let token = self
            .client
            .exchange(provider, code, pending.pkce_verifier.as_deref())
            .await?;
        let identity = self
            .client
            .fetch_identity(provider, &token.access_token)
            .await?;
        let user = reconcile(self.users.as_ref(), &identity).await?;

        let token_stored = match self.tokens.put(&user.id, provider, &token).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Could not store {provider} token for user {}: {e}; continuing login",
                    user.id
                );
                false
            }
        };

        tracing::info!(
            "OAuth2 login successful for {} ({}) via {provider}",
            user.name,
            user.email
        );
        Ok(LoginOutcome {
            user,
            token,
            token_stored,
        })
    }
}
