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

//! Request types for the identity REST API.
//!
//! These types define the shape of request bodies and query parameters.
//! They are used by both the server (for deserialization) and clients
//! (for serialization). Provider names are plain strings here
//! (`"google"`, `"github"`, `"facebook"`, `"apple"`); the server parses them.

use serde::{Deserialize, Serialize};

/// Request body for `POST /oauth2/login`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub provider: Option<String>,

    /// Client-chosen state token. Ignored unless it is long enough to carry
    /// 256 bits of entropy.
    #[serde(default)]
    pub state: Option<String>,
}

/// Request body for `POST /oauth2/callback`.
///
/// The provider travels out of band, as `?provider=` or the
/// `X-OAuth-Provider` header.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CallbackRequest {
    pub code: String,
    pub state: String,
}

/// Query parameters for `POST /oauth2/callback`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CallbackQuery {
    #[serde(default)]
    pub provider: Option<String>,
}

/// Query parameters for `GET /oauth2/{provider}/redirect`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RedirectQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Request body for `POST /api/tokens/refresh`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshTokenRequest {
    pub user_id: String,
    pub provider: String,
}
