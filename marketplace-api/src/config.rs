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

//! Application configuration loaded from environment variables.

use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::flow::DEFAULT_STATE_TTL_SECS;
use crate::oauth::{Provider, ProviderConfig};
use crate::tokens::DEFAULT_REFRESH_MARGIN_SECS;

const TIMEOUT_RANGE: RangeInclusive<u64> = 1..=300;
const MARGIN_RANGE: RangeInclusive<i64> = 0..=86_400;
const STATE_TTL_RANGE: RangeInclusive<i64> = 1..=86_400;

/// Where users, tokens and pending authorizations are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    /// Process memory; for local development only.
    Memory,
}

/// Configuration for the identity service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server (e.g. "0.0.0.0:8080").
    pub listen_addr: String,
    pub storage: StorageKind,
    /// PostgreSQL connection string. Required for [`StorageKind::Postgres`].
    pub database_url: Option<String>,
    /// 64 hex characters (AES-256 key) used to seal stored provider tokens.
    pub token_encryption_key: String,
    /// Frontend page that `GET /oauth2/{provider}/redirect` sends users to.
    pub frontend_success_url: String,
    pub provider_timeout_secs: u64,
    pub refresh_margin_secs: i64,
    pub state_ttl_secs: i64,
    /// Every provider with a configured client ID, in [`Provider::ALL`] order.
    pub providers: Vec<(Provider, ProviderConfig)>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required
    /// - `TOKEN_ENCRYPTION_KEY`
    /// - `DATABASE_URL` (unless `STORAGE=memory`)
    ///
    /// # Optional
    /// - `LISTEN_ADDR` (default: `"0.0.0.0:8080"`)
    /// - `STORAGE` (`"postgres"` or `"memory"`, default: `"postgres"`)
    /// - `FRONTEND_SUCCESS_URL` (default: `"http://localhost:3000/auth/success"`)
    /// - `PROVIDER_HTTP_TIMEOUT_SECS` (default: `"10"`, 1 to 300)
    /// - `TOKEN_REFRESH_MARGIN_SECS` (default: `"60"`, 0 to 86400)
    /// - `OAUTH_STATE_TTL_SECS` (default: `"600"`, 1 to 86400)
    /// - Per provider (`GOOGLE`, `GITHUB`, `FACEBOOK`, `APPLE`): `<P>_CLIENT_ID`,
    ///   `<P>_CLIENT_SECRET`, `<P>_REDIRECT_URL`, and optionally `<P>_SCOPES`,
    ///   `<P>_AUTH_URL`, `<P>_TOKEN_URL`, `<P>_USERINFO_URL`
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage = match var("STORAGE").map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("postgres") => StorageKind::Postgres,
            Some("memory") => StorageKind::Memory,
            Some(other) => {
                return Err(format!(
                    "STORAGE must be 'postgres' or 'memory', got '{other}'"
                ));
            }
        };
        let database_url = var("DATABASE_URL");
        if storage == StorageKind::Postgres && database_url.is_none() {
            return Err("DATABASE_URL environment variable is required".to_string());
        }

        let token_encryption_key = var("TOKEN_ENCRYPTION_KEY")
            .ok_or("TOKEN_ENCRYPTION_KEY environment variable is required")?;

        let listen_addr = var("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let frontend_success_url = var("FRONTEND_SUCCESS_URL")
            .unwrap_or_else(|| "http://localhost:3000/auth/success".to_string());
        url::Url::parse(&frontend_success_url)
            .map_err(|e| format!("FRONTEND_SUCCESS_URL must be an absolute URL: {e}"))?;

        let provider_timeout_secs = parse_in_range(
            var("PROVIDER_HTTP_TIMEOUT_SECS"),
            10,
            TIMEOUT_RANGE,
            "PROVIDER_HTTP_TIMEOUT_SECS",
        )?;
        let refresh_margin_secs = parse_in_range(
            var("TOKEN_REFRESH_MARGIN_SECS"),
            DEFAULT_REFRESH_MARGIN_SECS,
            MARGIN_RANGE,
            "TOKEN_REFRESH_MARGIN_SECS",
        )?;
        let state_ttl_secs = parse_in_range(
            var("OAUTH_STATE_TTL_SECS"),
            DEFAULT_STATE_TTL_SECS,
            STATE_TTL_RANGE,
            "OAUTH_STATE_TTL_SECS",
        )?;

        let mut providers = Vec::new();
        for provider in Provider::ALL {
            if let Some(config) = provider_from_lookup(provider, &var)? {
                providers.push((provider, config));
            }
        }

        Ok(Self {
            listen_addr,
            storage,
            database_url,
            token_encryption_key,
            frontend_success_url,
            provider_timeout_secs,
            refresh_margin_secs,
            state_ttl_secs,
            providers,
        })
    }
}

fn parse_in_range<T>(
    value: Option<String>,
    default: T,
    range: RangeInclusive<T>,
    name: &str,
) -> Result<T, String>
where
    T: FromStr + PartialOrd + Display,
{
    let parsed = match value {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{name} must be a valid integer"))?,
        None => default,
    };
    if !range.contains(&parsed) {
        return Err(format!(
            "{name} must be between {} and {}, got {parsed}",
            range.start(),
            range.end()
        ));
    }
    Ok(parsed)
}

/// `None` when `<P>_CLIENT_ID` is unset or empty.
fn provider_from_lookup<F>(
    provider: Provider,
    var: &F,
) -> Result<Option<ProviderConfig>, String>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = provider.env_prefix();
    let Some(client_id) = var(&format!("{prefix}_CLIENT_ID")) else {
        return Ok(None);
    };
    let required = |name: &str| {
        var(&format!("{prefix}_{name}"))
            .ok_or_else(|| format!("{prefix}_{name} required when {prefix}_CLIENT_ID is set"))
    };
    let client_secret = required("CLIENT_SECRET")?;
    let redirect_url = required("REDIRECT_URL")?;

    let mut config =
        ProviderConfig::with_defaults(provider, client_id, client_secret, redirect_url);

    if let Some(scopes) = var(&format!("{prefix}_SCOPES")) {
        config.scopes = scopes
            .split([' ', ','])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(url) = var(&format!("{prefix}_AUTH_URL")) {
        config.auth_url = url;
    }
    if let Some(url) = var(&format!("{prefix}_TOKEN_URL")) {
        config.token_url = url;
    }
    if let Some(url) = var(&format!("{prefix}_USERINFO_URL")) {
        config.userinfo_url = Some(url);
    }

    for (name, value) in [
        ("AUTH_URL", Some(&config.auth_url)),
        ("TOKEN_URL", Some(&config.token_url)),
        ("USERINFO_URL", config.userinfo_url.as_ref()),
        ("REDIRECT_URL", Some(&config.redirect_url)),
    ] {
        if let Some(value) = value {
            url::Url::parse(value)
                .map_err(|e| format!("{prefix}_{name} must be an absolute URL: {e}"))?;
        }
    }

    Ok(Some(config))
}
