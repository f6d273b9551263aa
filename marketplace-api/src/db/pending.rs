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

//! `oauth_pending_authorizations` table queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::oauth::{AuthError, PendingAuthorization, StateStore};

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    state: String,
    provider: String,
    pkce_verifier: Option<String>,
    expires_at: DateTime<Utc>,
}

pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete attempts that expired before `now`. Returns the number removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM oauth_pending_authorizations WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(AuthError::storage)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn save(&self, pending: PendingAuthorization) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_pending_authorizations (state, provider, pkce_verifier, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&pending.state)
        .bind(pending.provider.as_str())
        .bind(&pending.pkce_verifier)
        .bind(pending.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            // A client-chosen state that collides with a pending one.
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::InvalidState,
            other => AuthError::storage(other),
        })?;
        Ok(())
    }

    /// DELETE ... RETURNING makes the read and the invalidation one statement,
    /// so two callbacks racing on the same state cannot both win.
    async fn take(&self, state: &str) -> Result<Option<PendingAuthorization>, AuthError> {
        let row = sqlx::query_as::<_, PendingRow>(
            r#"
            DELETE FROM oauth_pending_authorizations
            WHERE state = $1
            RETURNING state, provider, pkce_verifier, expires_at
            "#,
        )
        .bind(state)
        .fetch_optional(&self.pool)
        .await
        .map_err(AuthError::storage)?;

        row.map(|row| -> Result<PendingAuthorization, AuthError> {
            Ok(PendingAuthorization {
                provider: row.provider.parse()?,
                state: row.state,
                pkce_verifier: row.pkce_verifier,
                expires_at: row.expires_at,
            })
        })
        .transpose()
    }
}
