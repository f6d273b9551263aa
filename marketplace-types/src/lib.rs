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

//! Shared API types for the content-marketplace identity service.
//!
//! This crate defines the HTTP contract between the identity backend
//! and its consumers (frontend, other services, integration tests).
//! It depends on serde only: no axum, no database types.

pub mod error;
pub mod requests;
pub mod responses;

pub use error::APIError;
pub use responses::APIResponse;
