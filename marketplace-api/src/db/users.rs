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

//! `users` table queries and the user-persistence collaborator interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marketplace_types::responses::UserResponse;
use sqlx::PgPool;

use crate::oauth::AuthError;

pub const DEFAULT_ROLE: &str = "reader";
pub const DEFAULT_STATUS: &str = "active";

/// Row returned from the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LocalUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocalUser {
    pub fn into_response(self) -> UserResponse {
        UserResponse {
            id: self.id,
            email: self.email,
            name: self.name,
            avatar: self.avatar,
            role: self.role,
            status: self.status,
        }
    }
}

/// User persistence consumed by the identity reconciler.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<LocalUser>, AuthError>;
    async fn create_user(&self, user: &LocalUser) -> Result<(), AuthError>;
    async fn update_user(&self, user: &LocalUser) -> Result<(), AuthError>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<LocalUser>, AuthError> {
        sqlx::query_as::<_, LocalUser>(
            r#"
            SELECT id, email, name, avatar, role, status, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AuthError::storage)
    }

    /// Plain INSERT: the unique index on `email` turns a concurrent duplicate
    /// into an error instead of a second row.
    async fn create_user(&self, user: &LocalUser) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, avatar, role, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.avatar)
        .bind(&user.role)
        .bind(&user.status)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(AuthError::storage)?;
        Ok(())
    }

    async fn update_user(&self, user: &LocalUser) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $2, avatar = $3, role = $4, status = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.avatar)
        .bind(&user.role)
        .bind(&user.status)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(AuthError::storage)?;
        Ok(())
    }
}
