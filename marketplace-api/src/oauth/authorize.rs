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

//! Authorization URL construction with a fresh anti-forgery state token.

use oauth2::{CsrfToken, PkceCodeChallenge};
use url::Url;

use super::error::AuthError;
use super::provider::{Provider, ProviderConfig, ProviderRegistry};

/// Random bytes in a state token (256 bits).
pub const STATE_BYTES: u32 = 32;

/// Length of a base64url (unpadded) encoding of [`STATE_BYTES`].
pub const STATE_MIN_LEN: usize = 43;

/// Everything the caller needs to redirect the user and later validate the callback.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub provider: Provider,
    pub auth_url: String,
    pub state: String,
    /// PKCE verifier to present at code exchange; `None` when PKCE is off.
    pub pkce_verifier: Option<String>,
}

/// Generate a URL-safe state token from the OS random source.
pub fn generate_state() -> String {
    CsrfToken::new_random_len(STATE_BYTES).secret().clone()
}

/// A client-chosen state is only honoured when it could carry as much entropy
/// as one we would generate.
pub fn is_acceptable_state(state: &str) -> bool {
    state.len() >= STATE_MIN_LEN
        && state.len() <= 256
        && state
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Start an authorization-code flow for `provider` with a freshly generated state.
pub fn begin_auth(
    registry: &ProviderRegistry,
    provider: Provider,
) -> Result<AuthorizationRequest, AuthError> {
    begin_auth_with_state(registry, provider, generate_state())
}

/// Start an authorization-code flow using a caller-provided state token.
pub fn begin_auth_with_state(
    registry: &ProviderRegistry,
    provider: Provider,
    state: String,
) -> Result<AuthorizationRequest, AuthError> {
    if !provider.supports_login() {
        return Err(AuthError::UnknownProvider(provider.to_string()));
    }
    let config = registry.require(provider)?;

    let (challenge, verifier) = if config.use_pkce {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        (
            Some(challenge.as_str().to_string()),
            Some(verifier.secret().clone()),
        )
    } else {
        (None, None)
    };

    let auth_url = build_auth_url(provider, config, &state, challenge.as_deref())?;

    Ok(AuthorizationRequest {
        provider,
        auth_url,
        state,
        pkce_verifier: verifier,
    })
}

/// Build the provider authorization URL. Parameters are URL-encoded.
pub fn build_auth_url(
    provider: Provider,
    config: &ProviderConfig,
    state: &str,
    code_challenge: Option<&str>,
) -> Result<String, AuthError> {
    let mut url = Url::parse(&config.auth_url).map_err(|e| {
        AuthError::UnknownProvider(format!("{provider}: bad authorization URL: {e}"))
    })?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("client_id", &config.client_id);
        pairs.append_pair("redirect_uri", &config.redirect_url);
        pairs.append_pair("response_type", "code");
        pairs.append_pair("scope", &config.scope_param());
        pairs.append_pair("state", state);

        if let Some(challenge) = code_challenge {
            pairs.append_pair("code_challenge", challenge);
            pairs.append_pair("code_challenge_method", "S256");
        }
        // Google only issues a refresh token for offline access with consent.
        if provider == Provider::Google {
            pairs.append_pair("access_type", "offline");
            pairs.append_pair("prompt", "consent");
        }
    }

    Ok(url.to_string())
}
