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

//! Provider profile responses and their normalization into [`CanonicalIdentity`].
//!
//! Every provider shape implements [`UserProfile`]; [`ProviderClient::fetch_identity`]
//! is the only place that picks a shape from a [`Provider`].

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::exchange::ProviderClient;
use super::provider::Provider;

/// Provider-agnostic identity produced on every callback. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    /// Provider-assigned subject identifier.
    pub subject: String,
    /// May be empty (e.g. GitHub users with a private primary email).
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub provider: Provider,
    pub retrieved_at: DateTime<Utc>,
}

/// A provider's raw profile response.
pub trait UserProfile: DeserializeOwned {
    /// Map into canonical fields; anything unavailable becomes `""`.
    fn into_identity(self, provider: Provider, retrieved_at: DateTime<Utc>) -> CanonicalIdentity;
}

/// OpenID Connect UserInfo response (Google).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GoogleProfile {
    pub sub: Option<String>,
    /// Legacy v2 endpoint field, same meaning as `sub`.
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

impl GoogleProfile {
    /// Coalesce `name`, then `given_name + family_name`.
    fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match (&self.given_name, &self.family_name) {
            (Some(g), Some(f)) if !g.is_empty() && !f.is_empty() => format!("{g} {f}"),
            (Some(g), _) if !g.is_empty() => g.clone(),
            _ => String::new(),
        }
    }
}

impl UserProfile for GoogleProfile {
    fn into_identity(self, provider: Provider, retrieved_at: DateTime<Utc>) -> CanonicalIdentity {
        let name = self.display_name();
        CanonicalIdentity {
            subject: self.sub.or(self.id).unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            name,
            avatar_url: self.picture.unwrap_or_default(),
            provider,
            retrieved_at,
        }
    }
}

/// `GET /user` response (GitHub). `name` and `email` are null when the user
/// has not made them public.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubProfile {
    pub id: Option<u64>,
    pub login: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserProfile for GitHubProfile {
    fn into_identity(self, provider: Provider, retrieved_at: DateTime<Utc>) -> CanonicalIdentity {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .or(self.login)
            .unwrap_or_default();
        CanonicalIdentity {
            subject: self.id.map(|id| id.to_string()).unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            name,
            avatar_url: self.avatar_url.unwrap_or_default(),
            provider,
            retrieved_at,
        }
    }
}

/// Graph API `/me?fields=id,name,email,picture` response (Facebook).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FacebookProfile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<FacebookPicture>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FacebookPicture {
    pub data: Option<FacebookPictureData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FacebookPictureData {
    pub url: Option<String>,
}

impl UserProfile for FacebookProfile {
    fn into_identity(self, provider: Provider, retrieved_at: DateTime<Utc>) -> CanonicalIdentity {
        CanonicalIdentity {
            subject: self.id.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            avatar_url: self
                .picture
                .and_then(|p| p.data)
                .and_then(|d| d.url)
                .unwrap_or_default(),
            provider,
            retrieved_at,
        }
    }
}

impl ProviderClient {
    /// Fetch the profile of the user owning `access_token` and normalize it.
    pub async fn fetch_identity(
        &self,
        provider: Provider,
        access_token: &str,
    ) -> Result<CanonicalIdentity, AuthError> {
        let config = self.registry().require(provider)?;
        let url = config
            .userinfo_url
            .as_deref()
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;

        match provider {
            Provider::Google => {
                self.fetch_profile::<GoogleProfile>(provider, url, access_token)
                    .await
            }
            Provider::GitHub => {
                self.fetch_profile::<GitHubProfile>(provider, url, access_token)
                    .await
            }
            Provider::Facebook => {
                self.fetch_profile::<FacebookProfile>(provider, url, access_token)
                    .await
            }
            Provider::Apple => Err(AuthError::UnknownProvider(provider.to_string())),
        }
    }

    async fn fetch_profile<P: UserProfile>(
        &self,
        provider: Provider,
        url: &str,
        access_token: &str,
    ) -> Result<CanonicalIdentity, AuthError> {
        let accept = match provider {
            Provider::GitHub => "application/vnd.github+json",
            _ => "application/json",
        };

        let resp = self
            .http()
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(AuthError::unreachable)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(
                "{provider} user-info request failed. Status: {status}, Body: {body}"
            );
            let detail = format!("{provider} user-info returned HTTP {status}");
            return Err(if status.is_server_error() {
                AuthError::ProviderUnreachable(detail)
            } else {
                AuthError::MalformedProviderResponse(detail)
            });
        }

        let body = resp.text().await.map_err(AuthError::unreachable)?;
        let profile: P = serde_json::from_str(&body).map_err(|e| {
            AuthError::MalformedProviderResponse(format!("{provider} user-info: {e}"))
        })?;

        Ok(profile.into_identity(provider, Utc::now()))
    }
}
