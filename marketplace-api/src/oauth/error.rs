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

//! Typed failure kinds for the identity federation core.
//!
//! Callers match on the variant, never on the message text.

use thiserror::Error;

use super::provider::Provider;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider is not registered, or cannot be used for this operation
    /// (Apple is refresh-only).
    #[error("unknown or unsupported provider: {0}")]
    UnknownProvider(String),

    /// The provider rejected the authorization code.
    #[error("provider rejected the authorization code")]
    InvalidGrant,

    /// Transport failure, timeout, or a provider-side 5xx.
    #[error("provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// The provider answered, but not with the JSON shape we expect.
    #[error("malformed provider response: {0}")]
    MalformedProviderResponse(String),

    #[error("no stored token for user {user_id} and provider {provider}")]
    NoTokenFound { user_id: String, provider: Provider },

    /// The provider rejected the refresh token; the user must re-authorize.
    #[error("provider denied the token refresh")]
    RefreshDenied,

    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Unknown, expired, already used, or issued for another provider. Also
    /// returned when a client-chosen state is already pending.
    #[error("invalid or expired OAuth2 state")]
    InvalidState,

    #[error("identity from {0} carries no email address")]
    MissingEmail(Provider),
}

impl AuthError {
    pub(crate) fn unreachable(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ProviderUnreachable("request timed out".to_string())
        } else {
            Self::ProviderUnreachable(err.to_string())
        }
    }

    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        Self::StorageFailure(err.to_string())
    }
}
