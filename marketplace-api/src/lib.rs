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

//! Identity federation service library.
//!
//! This crate provides the OAuth2 client flows, provider token storage and
//! refresh, the Axum router, application state, and configuration. The
//! binary entry point (`main.rs`) is a thin wrapper that calls into this
//! library.

pub mod config;
pub mod db;
pub mod error;
pub mod flow;
pub mod oauth;
pub mod reconcile;
pub mod routes;
pub mod state;
pub mod tokens;
