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

//! Find-or-create of local users from provider identities.
//!
//! Email is the join key: at most one local user exists per email. Profile
//! drift (name, avatar) on an existing user is overwritten with the freshest
//! provider data.

use chrono::Utc;
use uuid::Uuid;

use crate::db::users::{LocalUser, UserRepository, DEFAULT_ROLE, DEFAULT_STATUS};
use crate::oauth::{AuthError, CanonicalIdentity};

/// Return the local user for `identity`, creating or updating it as needed.
///
/// Writes nothing when the stored user already matches, so repeated calls
/// with the same identity are idempotent. Repository errors are returned as-is.
pub async fn reconcile(
    users: &dyn UserRepository,
    identity: &CanonicalIdentity,
) -> Result<LocalUser, AuthError> {
    if identity.email.is_empty() {
        return Err(AuthError::MissingEmail(identity.provider));
    }

    match users.find_user_by_email(&identity.email).await? {
        None => {
            let now = Utc::now();
            let user = LocalUser {
                id: Uuid::new_v4().to_string(),
                email: identity.email.clone(),
                name: identity.name.clone(),
                avatar: identity.avatar_url.clone(),
                role: DEFAULT_ROLE.to_string(),
                status: DEFAULT_STATUS.to_string(),
                created_at: now,
                updated_at: now,
            };
            users.create_user(&user).await?;
            tracing::info!("Created user {} for {} via {}", user.id, user.email, identity.provider);
            Ok(user)
        }
        Some(mut user) => {
            if user.name == identity.name && user.avatar == identity.avatar_url {
                return Ok(user);
            }
            user.name = identity.name.clone();
            user.avatar = identity.avatar_url.clone();
            user.updated_at = Utc::now();
            users.update_user(&user).await?;
            tracing::debug!("Updated profile of user {} from {}", user.id, identity.provider);
            Ok(user)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryUserRepository;
    use crate::oauth::Provider;

    fn identity(email: &str, name: &str, avatar: &str) -> CanonicalIdentity {
        CanonicalIdentity {
            subject: "sub-1".to_string(),
            email: email.to_string(),
            name: name.to_string(),
            avatar_url: avatar.to_string(),
            provider: Provider::Google,
            retrieved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn new_email_creates_reader() {
        let repo = MemoryUserRepository::default();
        let user = reconcile(&repo, &identity("ada@example.com", "Ada", "https://a/1"))
            .await
            .unwrap();

        assert_eq!(user.role, "reader");
        assert_eq!(user.status, "active");
        assert_eq!(user.name, "Ada");
        assert_eq!(user.avatar, "https://a/1");
        assert!(Uuid::parse_str(&user.id).is_ok());
        assert_eq!(repo.get("ada@example.com"), Some(user));
    }

    #[tokio::test]
    async fn identical_identity_is_written_once() {
        let repo = MemoryUserRepository::default();
        let id = identity("ada@example.com", "Ada", "https://a/1");

        let first = reconcile(&repo, &id).await.unwrap();
        let second = reconcile(&repo, &id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.write_count(), 1);
    }

    #[tokio::test]
    async fn changed_avatar_updates_without_duplicating() {
        let repo = MemoryUserRepository::default();
        let original = reconcile(&repo, &identity("ada@example.com", "Ada", "https://a/1"))
            .await
            .unwrap();

        let updated = reconcile(&repo, &identity("ada@example.com", "Ada", "https://a/2"))
            .await
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.avatar, "https://a/2");
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.create_count(), 1);
        assert_eq!(repo.get("ada@example.com").unwrap().avatar, "https://a/2");
    }

    #[tokio::test]
    async fn name_comparison_is_case_sensitive() {
        let repo = MemoryUserRepository::default();
        reconcile(&repo, &identity("ada@example.com", "Ada", "")).await.unwrap();
        let user = reconcile(&repo, &identity("ada@example.com", "ADA", "")).await.unwrap();

        assert_eq!(user.name, "ADA");
        assert_eq!(repo.write_count(), 2);
    }

    #[tokio::test]
    async fn empty_email_is_refused_before_lookup() {
        let repo = MemoryUserRepository::default();
        let err = reconcile(&repo, &identity("", "octocat", "")).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingEmail(Provider::Google)));
        assert!(repo.is_empty());
    }
}
