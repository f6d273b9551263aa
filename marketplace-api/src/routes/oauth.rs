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

//! OAuth2 route handlers: login, JSON callback, browser redirect callback.
//!
//! Successful responses are returned unwrapped (the frontend reads
//! `auth_url` and `access_token` at the top level); failures use the
//! `APIResponse<APIError>` envelope via [`AppError`].

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use marketplace_types::requests::{CallbackQuery, CallbackRequest, LoginRequest, RedirectQuery};
use marketplace_types::responses::{CallbackResponse, LoginResponse};

use crate::error::AppError;
use crate::flow::LoginOutcome;
use crate::oauth::Provider;
use crate::state::AppState;

/// Header that may carry the provider name for `POST /oauth2/callback`.
pub const PROVIDER_HEADER: &str = "x-oauth-provider";

fn parse_provider(raw: Option<&str>) -> Result<Provider, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::invalid_request("provider is required"))?;
    Ok(raw.parse::<Provider>()?)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(b)| b)
        .map_err(|e| AppError::invalid_request(&e.body_text()))
}

/// POST /oauth2/login
///
/// Returns the provider authorization URL and the state the callback must echo.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let req = json_body(body)?;
    let provider = parse_provider(req.provider.as_deref())?;

    let auth = state
        .flow
        .begin_login(provider, req.state.as_deref())
        .await?;

    Ok(Json(LoginResponse {
        auth_url: auth.auth_url,
        state: auth.state,
    }))
}

/// POST /oauth2/callback?provider=<name>
///
/// The provider may also be given in the `X-OAuth-Provider` header; the query
/// parameter wins when both are present.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
    body: Result<Json<CallbackRequest>, JsonRejection>,
) -> Result<Json<CallbackResponse>, AppError> {
    let from_header = headers
        .get(PROVIDER_HEADER)
        .and_then(|v| v.to_str().ok());
    let provider = parse_provider(query.provider.as_deref().or(from_header))?;
    let req = json_body(body)?;
    if req.code.is_empty() {
        return Err(AppError::invalid_request("code is required"));
    }

    let LoginOutcome { user, token, .. } = state
        .flow
        .complete_login(provider, &req.code, &req.state)
        .await?;

    Ok(Json(CallbackResponse {
        expires_in: token.expires_in(Utc::now()),
        access_token: token.access_token,
        token_type: token.token_type,
        user: user.into_response(),
    }))
}

/// GET /oauth2/{provider}/redirect?code=...&state=...
///
/// Browser-facing variant of the callback: completes the login and sends the
/// user on to the frontend success page with the result in the query string.
pub async fn redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<RedirectQuery>,
) -> Result<Response, AppError> {
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::invalid_request("code is required"))?;
    let provider = parse_provider(Some(&provider))?;

    let LoginOutcome { user, token, .. } = state
        .flow
        .complete_login(provider, &code, query.state.as_deref().unwrap_or_default())
        .await?;

    let mut target = url::Url::parse(&state.frontend_success_url)
        .map_err(|e| AppError::internal(&format!("invalid frontend URL: {e}")))?;
    target
        .query_pairs_mut()
        .append_pair("user_id", &user.id)
        .append_pair("email", &user.email)
        .append_pair("name", &user.name)
        .append_pair("provider", provider.as_str())
        .append_pair("access_token", &token.access_token);

    Ok(Redirect::to(target.as_str()).into_response())
}
