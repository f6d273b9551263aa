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


//! Shared test helpers for marketplace-api integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use marketplace_api::config::{Config, StorageKind};
use marketplace_api::oauth::{Provider, ProviderConfig};
use marketplace_api::routes;
use marketplace_api::state::{AppState, Stores};
use marketplace_api::tokens::AesGcmCipher;
use serde::de::DeserializeOwned;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const FRONTEND_URL: &str = "https://shop.test/auth/success";
pub const GOOGLE_CLIENT_ID: &str = "test-google-client";
pub const GITHUB_CLIENT_ID: &str = "test-github-client";

/// The router plus handles on its in-memory stores.
pub struct TestApp {
    pub app: Router,
    pub stores: Stores,
}

/// Config with Google and GitHub pointed at `server`, under `/google/*` and
/// `/github/*` respectively.
pub fn test_config(server: &MockServer) -> Config {
    let mut google = ProviderConfig::with_defaults(
        Provider::Google,
        GOOGLE_CLIENT_ID,
        "google-secret",
        "https://shop.test/oauth2/google/redirect",
    );
    google.auth_url = format!("{}/google/auth", server.uri());
    google.token_url = format!("{}/google/token", server.uri());
    google.userinfo_url = Some(format!("{}/google/userinfo", server.uri()));

    let mut github = ProviderConfig::with_defaults(
        Provider::GitHub,
        GITHUB_CLIENT_ID,
        "github-secret",
        "https://shop.test/oauth2/github/redirect",
    );
    github.auth_url = format!("{}/github/authorize", server.uri());
    github.token_url = format!("{}/github/token", server.uri());
    github.userinfo_url = Some(format!("{}/github/user", server.uri()));

    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        storage: StorageKind::Memory,
        database_url: None,
        token_encryption_key: TEST_KEY_HEX.to_string(),
        frontend_success_url: FRONTEND_URL.to_string(),
        provider_timeout_secs: 5,
        refresh_margin_secs: 60,
        state_ttl_secs: 600,
        providers: vec![(Provider::Google, google), (Provider::GitHub, github)],
    }
}

/// Build the Axum router over in-memory stores, ready for `tower::ServiceExt::oneshot`.
pub fn build_app(server: &MockServer) -> TestApp {
    let config = test_config(server);
    let cipher = AesGcmCipher::from_hex(TEST_KEY_HEX).expect("test key is valid hex");
    let stores = Stores::memory(Arc::new(cipher));
    let state = AppState::new(&config, stores.clone()).expect("build app state");
    TestApp {
        app: routes::router().with_state(state),
        stores,
    }
}

/// Mount a Google token endpoint that accepts `code` and a userinfo endpoint
/// returning the given email.
pub async fn mount_google_login(server: &MockServer, email: &str) {
    Mock::given(method("POST"))
        .and(path("/google/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.google-access",
            "token_type": "Bearer",
            "refresh_token": "1//google-refresh",
            "expires_in": 3599,
            "scope": "openid email profile"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/google/userinfo"))
        .and(header("authorization", "Bearer ya29.google-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sub": "110248495921238986420",
            "email": email,
            "email_verified": true,
            "name": "Ada Lovelace",
            "picture": "https://lh3.googleusercontent.com/a/ada"
        })))
        .mount(server)
        .await;
}

/// Build a JSON request.
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> http::Request<Body> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

/// Consume a response body and deserialize JSON into `T`.
pub async fn response_json<T: DeserializeOwned>(resp: Response) -> T {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("deserialize response body")
}
