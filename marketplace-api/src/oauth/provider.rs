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

//! Supported identity providers and the registry of their client settings.
//!
//! The registry is built once at startup and shared behind an `Arc`; it is
//! never mutated while requests are being served.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// External identity provider. Used as the key for configuration, stored
/// tokens and pending authorizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    GitHub,
    Facebook,
    /// Only stored tokens can be refreshed; Apple cannot start a login here.
    Apple,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Google,
        Provider::GitHub,
        Provider::Facebook,
        Provider::Apple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::GitHub => "github",
            Provider::Facebook => "facebook",
            Provider::Apple => "apple",
        }
    }

    pub fn supports_login(&self) -> bool {
        !matches!(self, Provider::Apple)
    }

    /// Prefix of the environment variables configuring this provider.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Provider::Google => "GOOGLE",
            Provider::GitHub => "GITHUB",
            Provider::Facebook => "FACEBOOK",
            Provider::Apple => "APPLE",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::GitHub),
            "facebook" => Ok(Provider::Facebook),
            "apple" => Ok(Provider::Apple),
            other => Err(AuthError::UnknownProvider(other.to_string())),
        }
    }
}

/// Authorization URL, token URL, user-info URL, default scopes, PKCE.
type Endpoints = (
    &'static str,
    &'static str,
    Option<&'static str>,
    &'static [&'static str],
    bool,
);

/// Client credentials and endpoints for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    /// `None` for providers we never fetch a profile from.
    pub userinfo_url: Option<String>,
    /// Send an S256 PKCE challenge with the authorization request.
    pub use_pkce: bool,
}

impl ProviderConfig {
    /// Build a config with the provider's public endpoints and default scopes.
    pub fn with_defaults(
        provider: Provider,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        let (auth_url, token_url, userinfo_url, scopes, use_pkce): Endpoints = match provider {
            Provider::Google => (
                "https://accounts.google.com/o/oauth2/v2/auth",
                "https://oauth2.googleapis.com/token",
                Some("https://openidconnect.googleapis.com/v1/userinfo"),
                &["openid", "email", "profile"],
                true,
            ),
            Provider::GitHub => (
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
                Some("https://api.github.com/user"),
                &["read:user", "user:email"],
                false,
            ),
            Provider::Facebook => (
                "https://www.facebook.com/v19.0/dialog/oauth",
                "https://graph.facebook.com/v19.0/oauth/access_token",
                Some("https://graph.facebook.com/v19.0/me?fields=id,name,email,picture"),
                &["email", "public_profile"],
                false,
            ),
            Provider::Apple => (
                "https://appleid.apple.com/auth/authorize",
                "https://appleid.apple.com/auth/token",
                None,
                &["name", "email"],
                false,
            ),
        };

        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
            userinfo_url: userinfo_url.map(str::to_string),
            use_pkce,
        }
    }

    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Provider configurations keyed by [`Provider`].
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Provider, ProviderConfig>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the config for `provider`, replacing any previous one.
    pub fn register(&mut self, provider: Provider, config: ProviderConfig) {
        self.providers.insert(provider, config);
    }

    pub fn lookup(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.providers.get(&provider)
    }

    /// Like [`lookup`](Self::lookup) but fails with `UnknownProvider`.
    pub fn require(&self, provider: Provider) -> Result<&ProviderConfig, AuthError> {
        self.lookup(provider)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))
    }
}

impl FromIterator<(Provider, ProviderConfig)> for ProviderRegistry {
    fn from_iter<I: IntoIterator<Item = (Provider, ProviderConfig)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (provider, config) in iter {
            registry.register(provider, config);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_names_case_insensitively() {
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("GitHub".parse::<Provider>().unwrap(), Provider::GitHub);
        assert_eq!(" FACEBOOK ".parse::<Provider>().unwrap(), Provider::Facebook);
        assert_eq!("apple".parse::<Provider>().unwrap(), Provider::Apple);
    }

    #[test]
    fn unknown_provider_name_is_rejected() {
        let err = "myspace".parse::<Provider>().unwrap_err();
        assert!(matches!(err, AuthError::UnknownProvider(name) if name == "myspace"));
    }

    #[test]
    fn register_overwrites_previous_config() {
        let mut registry = ProviderRegistry::new();
        registry.register(
            Provider::Google,
            ProviderConfig::with_defaults(Provider::Google, "first", "s", "https://a/cb"),
        );
        registry.register(
            Provider::Google,
            ProviderConfig::with_defaults(Provider::Google, "second", "s", "https://a/cb"),
        );

        assert_eq!(registry.lookup(Provider::Google).unwrap().client_id, "second");
    }

    #[test]
    fn lookup_of_unregistered_provider_is_absent() {
        let registry = ProviderRegistry::new();
        assert!(registry.lookup(Provider::GitHub).is_none());
        assert!(matches!(
            registry.require(Provider::GitHub),
            Err(AuthError::UnknownProvider(_))
        ));
    }

    #[test]
    fn apple_has_no_userinfo_endpoint() {
        let cfg = ProviderConfig::with_defaults(Provider::Apple, "id", "secret", "https://a/cb");
        assert!(cfg.userinfo_url.is_none());
        assert!(!Provider::Apple.supports_login());
    }
}
