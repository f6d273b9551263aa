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

//! Provider-token lifecycle: sealing, storage, and serialized refresh.

pub mod cipher;
pub mod lock;
pub mod refresher;
pub mod store;

pub use cipher::{AesGcmCipher, TokenCipher};
pub use lock::KeyedLock;
pub use refresher::{RefreshOutcome, TokenRefresher, TokenSource, DEFAULT_REFRESH_MARGIN_SECS};
pub use store::{EncryptedTokenStore, TokenBackend, TokenStore};
