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

//! Application error type that implements Axum's `IntoResponse`.
//!
//! Every error is returned as `APIResponse<APIError>` with `success: false`,
//! paired with the appropriate HTTP status code. Provider response bodies and
//! storage details are logged, never echoed to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marketplace_types::{APIError, APIResponse};

use crate::oauth::AuthError;

/// Application-level error that pairs an HTTP status code with an [`APIError`].
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: APIError,
}

impl AppError {
    pub fn new(status: StatusCode, body: APIError) -> Self {
        Self { status, body }
    }

    pub fn invalid_request(detail: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, APIError::invalid_request(detail))
    }

    pub fn unknown_provider(provider: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, APIError::unknown_provider(provider))
    }

    pub fn internal(detail: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            APIError::internal_error(detail),
        )
    }

    /// Map a failure from the token refresh endpoint.
    ///
    /// Same as the `From<AuthError>` mapping except provider failures are
    /// reported as `REFRESH_FAILED`.
    pub fn refresh(err: AuthError) -> Self {
        match err {
            AuthError::ProviderUnreachable(_) | AuthError::MalformedProviderResponse(_) => {
                tracing::error!("Token refresh failed: {err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    APIError::refresh_failed(),
                )
            }
            other => other.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnknownProvider(provider) => Self::unknown_provider(&provider),
            AuthError::InvalidState => {
                Self::new(StatusCode::BAD_REQUEST, APIError::invalid_state())
            }
            AuthError::MissingEmail(_) => {
                Self::new(StatusCode::BAD_REQUEST, APIError::missing_email())
            }
            AuthError::NoTokenFound { provider, .. } => Self::new(
                StatusCode::NOT_FOUND,
                APIError::token_not_found(provider.as_str()),
            ),
            AuthError::RefreshDenied => {
                Self::new(StatusCode::UNAUTHORIZED, APIError::refresh_denied())
            }
            AuthError::InvalidGrant => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                APIError::invalid_grant(),
            ),
            AuthError::ProviderUnreachable(_) | AuthError::MalformedProviderResponse(_) => {
                tracing::error!("OAuth2 provider call failed: {err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    APIError::authentication_failed(),
                )
            }
            AuthError::StorageFailure(detail) => {
                tracing::error!("Storage failure: {detail}");
                Self::internal("storage failure")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = APIResponse::error(self.body);
        (self.status, Json(body)).into_response()
    }
}
