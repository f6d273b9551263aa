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

//! Identity service entry point.
//!
//! A standalone Axum service that signs marketplace users in through
//! third-party OAuth2 providers and keeps their provider tokens fresh.

use std::sync::Arc;
use std::time::Duration;

use marketplace_api::config::{Config, StorageKind};
use marketplace_api::db::pending::PgStateStore;
use marketplace_api::routes;
use marketplace_api::state::{AppState, Stores};
use marketplace_api::tokens::{AesGcmCipher, TokenCipher};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// How often expired pending authorizations are deleted.
const PENDING_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("failed to load configuration");

    let cipher: Arc<dyn TokenCipher> = Arc::new(
        AesGcmCipher::from_hex(&config.token_encryption_key)
            .expect("invalid TOKEN_ENCRYPTION_KEY"),
    );

    let stores = match config.storage {
        StorageKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL is required for postgres storage");
            let pool = PgPoolOptions::new()
                .max_connections(20)
                .connect(database_url)
                .await
                .expect("failed to connect to PostgreSQL");
            tracing::info!("Connected to PostgreSQL");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("failed to run migrations");

            spawn_pending_purge(PgStateStore::new(pool.clone()));
            Stores::postgres(pool, cipher)
        }
        StorageKind::Memory => {
            tracing::warn!("Using in-memory storage; users and tokens are lost on restart");
            Stores::memory(cipher)
        }
    };

    let providers: Vec<&str> = config.providers.iter().map(|(p, _)| p.as_str()).collect();
    if providers.is_empty() {
        tracing::warn!("No OAuth2 providers configured; every login will be rejected");
    } else {
        tracing::info!("OAuth2 providers: {}", providers.join(", "));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState::new(&config, stores).expect("failed to build application state");
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listener");

    tracing::info!("Identity service listening on {}", config.listen_addr);

    axum::serve(listener, app).await.expect("server error");
}

fn spawn_pending_purge(store: PgStateStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PENDING_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match store.purge_expired(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Purged {n} expired OAuth2 states"),
                Err(e) => tracing::warn!("Failed to purge expired OAuth2 states: {e}"),
            }
        }
    });
}
