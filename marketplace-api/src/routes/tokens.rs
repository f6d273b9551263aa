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

//! Provider token maintenance.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use marketplace_types::requests::RefreshTokenRequest;
use marketplace_types::responses::{RefreshTokenResponse, TokenInfo};

use crate::error::AppError;
use crate::oauth::Provider;
use crate::state::AppState;
use crate::tokens::TokenSource;

/// POST /api/tokens/refresh
///
/// Returns a token valid for at least the refresh margin, refreshing it at
/// the provider only when the stored one is about to expire.
pub async fn refresh_token(
    State(state): State<AppState>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<RefreshTokenResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::invalid_request(&e.body_text()))?;
    if req.user_id.trim().is_empty() {
        return Err(AppError::invalid_request("user_id is required"));
    }
    let provider = req.provider.parse::<Provider>()?;

    let outcome = state
        .refresher
        .ensure_valid(&req.user_id, provider)
        .await
        .map_err(AppError::refresh)?;

    let message = match outcome.source {
        TokenSource::Stored => "Stored token is still valid",
        TokenSource::Provider => "Token refreshed",
    };
    let token = outcome.token;

    Ok(Json(RefreshTokenResponse {
        success: true,
        message: message.to_string(),
        expires_in: token.expires_in(Utc::now()),
        refreshed_from: outcome.source.as_str().to_string(),
        token: TokenInfo {
            has_refresh_token: token.refresh_token.is_some(),
            expires_at: token.expires_at.timestamp(),
            access_token: token.access_token,
            token_type: token.token_type,
        },
    }))
}
