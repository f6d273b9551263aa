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

//! Database access: PostgreSQL queries plus in-memory stand-ins.

pub mod memory;
pub mod pending;
pub mod tokens;
pub mod users;
