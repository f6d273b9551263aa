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

//! API error types.
//!
//! Every failed API response is returned as `APIResponse<APIError>` with `success: false`.

use serde::{Deserialize, Serialize};

/// Structured error returned in the `result` field of a failed [`super::APIResponse`].
///
/// The `code` field is a machine-readable identifier (e.g. `"UNKNOWN_PROVIDER"`).
/// The `message` field is a generic, human-readable description. Provider error
/// bodies never end up here.
/// The `engineering_error` field carries debug-level detail that is useful during
/// development but should be stripped or redacted in production.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct APIError {
    /// Machine-readable error code (e.g. `"INVALID_STATE"`, `"TOKEN_NOT_FOUND"`).
    pub code: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional engineering-level detail for debugging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engineering_error: Option<String>,
}

impl APIError {
    fn with_code(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            engineering_error: None,
        }
    }

    pub fn invalid_request(detail: &str) -> Self {
        Self::with_code("INVALID_REQUEST", format!("Invalid request: {detail}"))
    }

    pub fn unknown_provider(provider: &str) -> Self {
        Self::with_code(
            "UNKNOWN_PROVIDER",
            format!("Provider '{provider}' is not supported"),
        )
    }

    pub fn invalid_state() -> Self {
        Self::with_code(
            "INVALID_STATE",
            "The login attempt is invalid or has expired. Please start again.",
        )
    }

    pub fn invalid_grant() -> Self {
        Self::with_code(
            "INVALID_GRANT",
            "The authorization code was rejected. Please sign in again.",
        )
    }

    pub fn missing_email() -> Self {
        Self::with_code(
            "EMAIL_REQUIRED",
            "The identity provider did not share an email address for this account.",
        )
    }

    pub fn authentication_failed() -> Self {
        Self::with_code("AUTHENTICATION_FAILED", "Authentication failed.")
    }

    pub fn token_not_found(provider: &str) -> Self {
        Self::with_code(
            "TOKEN_NOT_FOUND",
            format!("No stored token for provider '{provider}'"),
        )
    }

    pub fn refresh_denied() -> Self {
        Self::with_code(
            "REFRESH_DENIED",
            "The provider rejected the refresh. Re-authorization is required.",
        )
    }

    pub fn refresh_failed() -> Self {
        Self::with_code("REFRESH_FAILED", "Token refresh failed.")
    }

    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: "Internal server error".to_string(),
            engineering_error: Some(detail.to_string()),
        }
    }
}

impl std::fmt::Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for APIError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engineering_error_is_omitted_when_absent() {
        let json = serde_json::to_value(APIError::invalid_state()).unwrap();
        assert_eq!(json["code"], "INVALID_STATE");
        assert!(json.get("engineering_error").is_none());
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = APIError::unknown_provider("myspace");
        assert_eq!(
            err.to_string(),
            "[UNKNOWN_PROVIDER] Provider 'myspace' is not supported"
        );
    }
}
