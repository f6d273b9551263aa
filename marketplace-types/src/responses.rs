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

//! Response types for the identity REST API.
//!
//! Failures are always wrapped in an [`APIResponse<APIError>`] envelope:
//! `{ "success": false, "result": { "code": ..., "message": ... } }`.
//! Successful OAuth2 endpoints return their payloads unwrapped, because the
//! frontend reads `auth_url` / `access_token` at the top level.
//!
//! [`APIError`]: crate::error::APIError

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Generic envelope
// ---------------------------------------------------------------------------

/// Top-level API response envelope.
///
/// # Error example
///
/// ```json
/// { "success": false, "result": { "code": "TOKEN_NOT_FOUND", "message": "..." } }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct APIResponse<A: Serialize> {
    pub success: bool,
    pub result: A,
}

impl APIResponse<crate::error::APIError> {
    /// Wrap an error result.
    pub fn error(err: crate::error::APIError) -> Self {
        Self {
            success: false,
            result: err,
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint-specific response payloads
// ---------------------------------------------------------------------------

/// Response payload for `POST /oauth2/login`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginResponse {
    pub auth_url: String,
    pub state: String,
}

/// Local user as exposed to API consumers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
    pub role: String,
    pub status: String,
}

/// Response payload for `POST /oauth2/callback`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CallbackResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the provider access token expires (never negative).
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Token summary embedded in [`RefreshTokenResponse`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenInfo {
    pub access_token: String,
    pub token_type: String,
    /// Unix timestamp in seconds.
    pub expires_at: i64,
    pub has_refresh_token: bool,
}

/// Response payload for `POST /api/tokens/refresh`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshTokenResponse {
    pub success: bool,
    pub message: String,
    pub token: TokenInfo,
    /// `"stored"` when the cached token was still valid, `"provider"` when a
    /// refresh call was made.
    pub refreshed_from: String,
    pub expires_in: i64,
}

/// Response payload for `GET /health`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub status: String,
}
