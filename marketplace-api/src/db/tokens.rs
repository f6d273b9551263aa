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

//! `provider_tokens` table queries. Rows hold sealed blobs only.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::oauth::{AuthError, Provider};
use crate::tokens::TokenBackend;

pub struct PgTokenBackend {
    pool: PgPool,
}

impl PgTokenBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenBackend for PgTokenBackend {
    async fn put_sealed(
        &self,
        user_id: &str,
        provider: Provider,
        sealed: String,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO provider_tokens (user_id, provider, sealed_token, updated_at)
            VALUES ($1, $2, $3, CURRENT_TIMESTAMP)
            ON CONFLICT (user_id, provider)
            DO UPDATE SET sealed_token = $3, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(user_id)
        .bind(provider.as_str())
        .bind(sealed)
        .execute(&self.pool)
        .await
        .map_err(AuthError::storage)?;
        Ok(())
    }

    async fn get_sealed(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<String>, AuthError> {
        sqlx::query_scalar::<_, String>(
            "SELECT sealed_token FROM provider_tokens WHERE user_id = $1 AND provider = $2",
        )
        .bind(user_id)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(AuthError::storage)
    }
}
