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

//! OAuth2 client side of identity federation: provider registry,
//! authorization URLs, code exchange, refresh grants, user-info normalization
//! and state validation.

pub mod authorize;
pub mod error;
pub mod exchange;
pub mod pending;
pub mod profile;
pub mod provider;
pub mod token;

pub use authorize::{begin_auth, begin_auth_with_state, generate_state, AuthorizationRequest};
pub use error::AuthError;
pub use exchange::ProviderClient;
pub use pending::{consume_state, PendingAuthorization, StateStore};
pub use profile::{CanonicalIdentity, UserProfile};
pub use provider::{Provider, ProviderConfig, ProviderRegistry};
pub use token::ProviderToken;
