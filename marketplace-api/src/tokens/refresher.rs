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

//! Returns a usable provider token, refreshing it at most once per
//! (user, provider) at a time.

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::lock::KeyedLock;
use super::store::TokenStore;
use crate::oauth::{AuthError, Provider, ProviderClient, ProviderToken};

/// Default minimum remaining validity before a token is refreshed.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;

/// Where the token returned by [`TokenRefresher::ensure_valid`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Still valid in the store (possibly refreshed moments ago by another caller).
    Stored,
    /// Refreshed at the provider by this call.
    Provider,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::Stored => "stored",
            TokenSource::Provider => "provider",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub token: ProviderToken,
    pub source: TokenSource,
}

pub struct TokenRefresher {
    store: Arc<dyn TokenStore>,
    client: ProviderClient,
    margin: Duration,
    locks: KeyedLock<(String, Provider)>,
}

impl TokenRefresher {
    pub fn new(store: Arc<dyn TokenStore>, client: ProviderClient, margin: Duration) -> Self {
        Self {
            store,
            client,
            margin,
            locks: KeyedLock::new(),
        }
    }

    /// Return the stored token for the pair if it outlives the safety margin,
    /// otherwise refresh it at the provider and store the replacement.
    ///
    /// Concurrent callers for the same pair wait for the first refresh and
    /// then read its result instead of refreshing again.
    pub async fn ensure_valid(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<RefreshOutcome, AuthError> {
        let current = self.load(user_id, provider).await?;
        if current.is_fresh(self.margin, Utc::now()) {
            return Ok(RefreshOutcome {
                token: current,
                source: TokenSource::Stored,
            });
        }

        let _guard = self.locks.lock((user_id.to_string(), provider)).await;

        let current = self.load(user_id, provider).await?;
        if current.is_fresh(self.margin, Utc::now()) {
            tracing::debug!("{provider} token for {user_id} was refreshed by a concurrent request");
            return Ok(RefreshOutcome {
                token: current,
                source: TokenSource::Stored,
            });
        }

        let refreshed = self.client.refresh(provider, &current).await?;
        self.store.put(user_id, provider, &refreshed).await?;

        tracing::info!(
            "Refreshed {provider} token for {user_id}, valid until {}",
            refreshed.expires_at
        );
        Ok(RefreshOutcome {
            token: refreshed,
            source: TokenSource::Provider,
        })
    }

    async fn load(&self, user_id: &str, provider: Provider) -> Result<ProviderToken, AuthError> {
        self.store
            .get(user_id, provider)
            .await?
            .ok_or_else(|| AuthError::NoTokenFound {
                user_id: user_id.to_string(),
                provider,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::db::memory::MemoryTokenBackend;
    use crate::oauth::{ProviderConfig, ProviderRegistry};
    use crate::tokens::cipher::AesGcmCipher;
    use crate::tokens::store::EncryptedTokenStore;

    fn token_expiring_in(secs: i64) -> ProviderToken {
        ProviderToken {
            access_token: "old-access".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("old-refresh".to_string()),
            expires_at: Utc::now() + Duration::seconds(secs),
            scope: None,
        }
    }

    fn refresher(server: &MockServer) -> (Arc<TokenRefresher>, Arc<dyn TokenStore>) {
        let mut config = ProviderConfig::with_defaults(
            Provider::Google,
            "cid",
            "csecret",
            "https://app.test/cb",
        );
        config.token_url = format!("{}/token", server.uri());
        let registry: ProviderRegistry = [(Provider::Google, config)].into_iter().collect();
        let client = ProviderClient::new(Arc::new(registry), StdDuration::from_secs(5)).unwrap();
        let store: Arc<dyn TokenStore> = Arc::new(EncryptedTokenStore::new(
            MemoryTokenBackend::default(),
            Arc::new(AesGcmCipher::new(&[9u8; 32])),
        ));
        let refresher = TokenRefresher::new(
            store.clone(),
            client,
            Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
        );
        (Arc::new(refresher), store)
    }

    fn refreshed_body() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "new-access",
            "token_type": "Bearer",
            "expires_in": 3600
        }))
    }

    #[tokio::test]
    async fn missing_token_is_no_token_found() {
        let server = MockServer::start().await;
        let (refresher, _) = refresher(&server);
        let err = refresher.ensure_valid("u1", Provider::Google).await.unwrap_err();
        assert!(matches!(err, AuthError::NoTokenFound { .. }));
    }

    #[tokio::test]
    async fn fresh_token_is_returned_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(refreshed_body())
            .expect(0)
            .mount(&server)
            .await;

        let (refresher, store) = refresher(&server);
        let stored = token_expiring_in(3600);
        store.put("u1", Provider::Google, &stored).await.unwrap();

        let outcome = refresher.ensure_valid("u1", Provider::Google).await.unwrap();
        assert_eq!(outcome.source, TokenSource::Stored);
        assert_eq!(outcome.token, stored);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .respond_with(refreshed_body())
            .expect(1)
            .mount(&server)
            .await;

        let (refresher, store) = refresher(&server);
        store
            .put("u1", Provider::Google, &token_expiring_in(-10))
            .await
            .unwrap();

        let outcome = refresher.ensure_valid("u1", Provider::Google).await.unwrap();
        assert_eq!(outcome.source, TokenSource::Provider);
        assert_eq!(outcome.token.access_token, "new-access");
        assert_eq!(outcome.token.refresh_token.as_deref(), Some("old-refresh"));

        let persisted = store.get("u1", Provider::Google).await.unwrap().unwrap();
        assert_eq!(persisted, outcome.token);
        assert!(persisted.expires_at > Utc::now() + Duration::seconds(3000));
    }

    #[tokio::test]
    async fn token_inside_margin_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(refreshed_body())
            .expect(1)
            .mount(&server)
            .await;

        let (refresher, store) = refresher(&server);
        store
            .put("u1", Provider::Google, &token_expiring_in(30))
            .await
            .unwrap();

        let outcome = refresher.ensure_valid("u1", Provider::Google).await.unwrap();
        assert_eq!(outcome.source, TokenSource::Provider);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(refreshed_body().set_delay(StdDuration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;

        let (refresher, store) = refresher(&server);
        store
            .put("u1", Provider::Google, &token_expiring_in(-10))
            .await
            .unwrap();

        let a = tokio::spawn({
            let refresher = refresher.clone();
            async move { refresher.ensure_valid("u1", Provider::Google).await }
        });
        let b = tokio::spawn({
            let refresher = refresher.clone();
            async move { refresher.ensure_valid("u1", Provider::Google).await }
        });

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_eq!(a.token, b.token);
        assert_eq!(a.token.access_token, "new-access");

        let mut sources = [a.source, b.source];
        sources.sort_by_key(|s| s.as_str());
        assert_eq!(sources, [TokenSource::Provider, TokenSource::Stored]);
    }

    #[tokio::test]
    async fn revoked_refresh_token_is_denied_and_store_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (refresher, store) = refresher(&server);
        let stale = token_expiring_in(-10);
        store.put("u1", Provider::Google, &stale).await.unwrap();

        let err = refresher.ensure_valid("u1", Provider::Google).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshDenied));
        assert_eq!(store.get("u1", Provider::Google).await.unwrap(), Some(stale));
    }

    #[tokio::test]
    async fn out_of_range_lifetime_is_malformed_and_releases_the_lock() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "expires_in": i64::MAX
            })))
            .expect(2)
            .mount(&server)
            .await;

        let (refresher, store) = refresher(&server);
        let stale = token_expiring_in(-10);
        store.put("u1", Provider::Google, &stale).await.unwrap();

        for _ in 0..2 {
            let err = refresher.ensure_valid("u1", Provider::Google).await.unwrap_err();
            assert!(matches!(err, AuthError::MalformedProviderResponse(_)));
        }
        assert_eq!(store.get("u1", Provider::Google).await.unwrap(), Some(stale));
    }
}
