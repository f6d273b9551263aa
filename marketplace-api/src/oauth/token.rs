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

//! Provider access/refresh token pair and the raw token-endpoint response.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Lifetime assumed when the provider omits `expires_in` (GitHub OAuth apps).
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Token issued by a provider for one (user, provider) pair.
///
/// Replaced wholesale on refresh; never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderToken {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
}

impl ProviderToken {
    /// Whole seconds until expiry, clamped at zero.
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    /// True when the token stays valid for strictly more than `margin`.
    pub fn is_fresh(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - now > margin
    }
}

/// Successful body of a token-endpoint call.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenEndpointResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenEndpointResponse {
    /// Parse a 2xx token-endpoint body.
    ///
    /// GitHub reports a bad code as `200 {"error": "..."}`, so an `error` member
    /// is a rejection regardless of the status code; `Ok(None)` signals it.
    pub fn parse(body: &str) -> Result<Option<Self>, AuthError> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| AuthError::MalformedProviderResponse(format!("token response: {e}")))?;

        if value.get("error").is_some() && value.get("access_token").is_none() {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AuthError::MalformedProviderResponse(format!("token response: {e}")))
    }

    /// Convert into an absolute-expiry token. `previous_refresh` is kept when
    /// the provider does not rotate the refresh token.
    ///
    /// An `expires_in` too large to represent as a timestamp is malformed.
    pub fn into_token(
        self,
        now: DateTime<Utc>,
        previous_refresh: Option<String>,
    ) -> Result<ProviderToken, AuthError> {
        let lifetime = self
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                AuthError::MalformedProviderResponse(format!(
                    "token response: expires_in {lifetime} out of range"
                ))
            })?;

        Ok(ProviderToken {
            access_token: self.access_token,
            token_type: self
                .token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at,
            scope: self.scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_in(secs: i64, now: DateTime<Utc>) -> ProviderToken {
        ProviderToken {
            access_token: "at".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expires_at: now + Duration::seconds(secs),
            scope: None,
        }
    }

    #[test]
    fn freshness_respects_margin() {
        let now = Utc::now();
        let margin = Duration::seconds(60);
        assert!(token_expiring_in(3600, now).is_fresh(margin, now));
        assert!(token_expiring_in(61, now).is_fresh(margin, now));
        assert!(!token_expiring_in(60, now).is_fresh(margin, now));
        assert!(!token_expiring_in(-10, now).is_fresh(margin, now));
    }

    #[test]
    fn expires_in_is_never_negative() {
        let now = Utc::now();
        assert_eq!(token_expiring_in(-10, now).expires_in(now), 0);
        assert_eq!(token_expiring_in(90, now).expires_in(now), 90);
    }

    #[test]
    fn parse_treats_error_member_as_rejection() {
        let parsed = TokenEndpointResponse::parse(
            r#"{"error":"bad_verification_code","error_description":"The code is incorrect."}"#,
        )
        .unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = TokenEndpointResponse::parse("access_token=abc&scope=repo").unwrap_err();
        assert!(matches!(err, AuthError::MalformedProviderResponse(_)));
    }

    #[test]
    fn into_token_keeps_previous_refresh_token_when_not_rotated() {
        let now = Utc::now();
        let parsed = TokenEndpointResponse::parse(r#"{"access_token":"new","expires_in":120}"#)
            .unwrap()
            .unwrap();
        let token = parsed
            .into_token(now, Some("old-refresh".to_string()))
            .unwrap();

        assert_eq!(token.access_token, "new");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.expires_at, now + Duration::seconds(120));
    }

    #[test]
    fn into_token_defaults_lifetime_when_expires_in_missing() {
        let now = Utc::now();
        let parsed = TokenEndpointResponse::parse(
            r#"{"access_token":"gho_x","token_type":"bearer","scope":"read:user"}"#,
        )
        .unwrap()
        .unwrap();
        let token = parsed.into_token(now, None).unwrap();
        assert_eq!(
            token.expires_at,
            now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS)
        );
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.scope.as_deref(), Some("read:user"));
    }

    #[test]
    fn into_token_rejects_unrepresentable_lifetime() {
        let parsed = TokenEndpointResponse::parse(
            r#"{"access_token":"x","expires_in":9223372036854775807}"#,
        )
        .unwrap()
        .unwrap();
        let err = parsed.into_token(Utc::now(), None).unwrap_err();
        assert!(matches!(err, AuthError::MalformedProviderResponse(_)));
    }
}
