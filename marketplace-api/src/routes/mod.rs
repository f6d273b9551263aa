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

//! Axum router configuration for the identity API.

pub mod oauth;
pub mod tokens;

use axum::{
    routing::{get, post},
    Json, Router,
};
use marketplace_types::responses::HealthResponse;

use crate::state::AppState;

/// Build the full application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // OAuth2 login
        .route("/oauth2/login", post(oauth::login))
        .route("/oauth2/callback", post(oauth::callback))
        .route("/oauth2/{provider}/redirect", get(oauth::redirect))
        // Provider tokens
        .route("/api/tokens/refresh", post(tokens::refresh_token))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
