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

//! Authorization code → token exchange, and refresh-token grants.
//!
//! Each call performs exactly one token-endpoint request. Authorization codes
//! are single-use, so nothing here retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::ACCEPT;

use super::error::AuthError;
use super::provider::{Provider, ProviderConfig, ProviderRegistry};
use super::token::{ProviderToken, TokenEndpointResponse};

/// Outcome of a token-endpoint request that reached the provider.
enum TokenGrant {
    Issued(TokenEndpointResponse),
    Rejected,
}

/// HTTP client bound to the provider registry. Cheap to clone.
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    registry: Arc<ProviderRegistry>,
}

impl ProviderClient {
    /// Every request made through this client is bounded by `timeout`.
    pub fn new(registry: Arc<ProviderRegistry>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("marketplace-api/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, registry })
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Exchange an authorization code for a provider token.
    ///
    /// Nothing is persisted here; the caller stores the returned token.
    pub async fn exchange(
        &self,
        provider: Provider,
        authorization_code: &str,
        pkce_verifier: Option<&str>,
    ) -> Result<ProviderToken, AuthError> {
        if !provider.supports_login() {
            return Err(AuthError::UnknownProvider(provider.to_string()));
        }
        let config = self.registry.require(provider)?;

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", authorization_code),
            ("redirect_uri", config.redirect_url.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];
        if let Some(verifier) = pkce_verifier {
            params.push(("code_verifier", verifier));
        }

        match self.post_token_form(provider, config, &params).await? {
            TokenGrant::Issued(response) => response.into_token(Utc::now(), None),
            TokenGrant::Rejected => Err(AuthError::InvalidGrant),
        }
    }

    /// Redeem `current`'s refresh token for a replacement token.
    pub async fn refresh(
        &self,
        provider: Provider,
        current: &ProviderToken,
    ) -> Result<ProviderToken, AuthError> {
        let config = self.registry.require(provider)?;
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or(AuthError::RefreshDenied)?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];

        match self.post_token_form(provider, config, &params).await? {
            TokenGrant::Issued(response) => {
                response.into_token(Utc::now(), current.refresh_token.clone())
            }
            TokenGrant::Rejected => Err(AuthError::RefreshDenied),
        }
    }

    async fn post_token_form(
        &self,
        provider: Provider,
        config: &ProviderConfig,
        params: &[(&str, &str)],
    ) -> Result<TokenGrant, AuthError> {
        let response = self
            .http
            .post(&config.token_url)
            .header(ACCEPT, "application/json")
            .form(params)
            .send()
            .await
            .map_err(AuthError::unreachable)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::unreachable)?;

        if status.is_server_error() {
            tracing::error!("{provider} token endpoint failed. Status: {status}, Body: {body}");
            return Err(AuthError::ProviderUnreachable(format!(
                "{provider} token endpoint returned HTTP {status}"
            )));
        }
        if status.is_client_error() {
            tracing::warn!(
                "{provider} token endpoint rejected the grant. Status: {status}, Body: {body}"
            );
            return Ok(TokenGrant::Rejected);
        }
        if !status.is_success() {
            return Err(AuthError::MalformedProviderResponse(format!(
                "{provider} token endpoint returned HTTP {status}"
            )));
        }

        match TokenEndpointResponse::parse(&body)? {
            Some(response) => Ok(TokenGrant::Issued(response)),
            None => {
                tracing::warn!("{provider} token endpoint returned an error body: {body}");
                Ok(TokenGrant::Rejected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer, provider: Provider) -> ProviderClient {
        let mut config =
            ProviderConfig::with_defaults(provider, "cid", "csecret", "https://app.test/cb");
        config.token_url = format!("{}/token", server.uri());
        let registry: ProviderRegistry = [(provider, config)].into_iter().collect();
        ProviderClient::new(Arc::new(registry), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn exchange_posts_authorization_code_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("accept", "application/json"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("code_verifier=verifier"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "token_type": "Bearer",
                "expires_in": 3599,
                "refresh_token": "1//refresh",
                "scope": "openid email profile"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::Google).await;
        let token = client
            .exchange(Provider::Google, "the-code", Some("verifier"))
            .await
            .unwrap();

        assert_eq!(token.access_token, "ya29.token");
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert!(token.expires_in(Utc::now()) > 3500);
    }

    #[tokio::test]
    async fn rejected_code_is_invalid_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::Google).await;
        let err = client.exchange(Provider::Google, "used", None).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidGrant));
    }

    #[tokio::test]
    async fn github_error_body_with_200_is_invalid_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "bad_verification_code"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::GitHub).await;
        let err = client.exchange(Provider::GitHub, "stale", None).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidGrant));
    }

    #[tokio::test]
    async fn server_error_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::Facebook).await;
        let err = client.exchange(Provider::Facebook, "c", None).await.unwrap_err();
        assert!(matches!(err, AuthError::ProviderUnreachable(_)));
    }

    #[tokio::test]
    async fn slow_provider_times_out_as_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "late"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::Google).await;
        let err = client.exchange(Provider::Google, "c", None).await.unwrap_err();
        assert!(matches!(err, AuthError::ProviderUnreachable(_)));
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::Google).await;
        let err = client.exchange(Provider::Google, "c", None).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedProviderResponse(_)));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_is_denied_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::Apple).await;
        let token = ProviderToken {
            access_token: "at".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expires_at: Utc::now(),
            scope: None,
        };
        let err = client.refresh(Provider::Apple, &token).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshDenied));
    }
}
