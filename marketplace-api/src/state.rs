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

//! Shared application state passed to every Axum handler via `State`.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::memory::{MemoryStateStore, MemoryTokenBackend, MemoryUserRepository};
use crate::db::pending::PgStateStore;
use crate::db::tokens::PgTokenBackend;
use crate::db::users::{PgUserRepository, UserRepository};
use crate::flow::IdentityFlow;
use crate::oauth::{ProviderClient, ProviderRegistry, StateStore};
use crate::tokens::{EncryptedTokenStore, TokenCipher, TokenRefresher, TokenStore};

/// The storage collaborators behind the identity flow.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenStore>,
    pub pending: Arc<dyn StateStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool, cipher: Arc<dyn TokenCipher>) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            tokens: Arc::new(EncryptedTokenStore::new(
                PgTokenBackend::new(pool.clone()),
                cipher,
            )),
            pending: Arc::new(PgStateStore::new(pool)),
        }
    }

    pub fn memory(cipher: Arc<dyn TokenCipher>) -> Self {
        Self {
            users: Arc::new(MemoryUserRepository::default()),
            tokens: Arc::new(EncryptedTokenStore::new(
                MemoryTokenBackend::default(),
                cipher,
            )),
            pending: Arc::new(MemoryStateStore::default()),
        }
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<IdentityFlow>,
    pub refresher: Arc<TokenRefresher>,
    /// Where `GET /oauth2/{provider}/redirect` sends the browser on success.
    pub frontend_success_url: String,
}

impl AppState {
    /// Wire the provider client, login flow and refresher over `stores`.
    pub fn new(config: &Config, stores: Stores) -> Result<Self, String> {
        let registry: ProviderRegistry = config.providers.iter().cloned().collect();
        let client = ProviderClient::new(
            Arc::new(registry),
            StdDuration::from_secs(config.provider_timeout_secs),
        )
        .map_err(|e| format!("failed to build HTTP client: {e}"))?;

        let flow = IdentityFlow::new(
            client.clone(),
            stores.users,
            stores.tokens.clone(),
            stores.pending,
            Duration::seconds(config.state_ttl_secs),
        );
        let refresher = TokenRefresher::new(
            stores.tokens,
            client,
            Duration::seconds(config.refresh_margin_secs),
        );

        Ok(Self {
            flow: Arc::new(flow),
            refresher: Arc::new(refresher),
            frontend_success_url: config.frontend_success_url.clone(),
        })
    }
}
