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

//! In-process implementations of the storage collaborators.
//!
//! Used by tests and for running the service without PostgreSQL
//! (`STORAGE=memory`). Nothing here survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::users::{LocalUser, UserRepository};
use crate::oauth::{AuthError, PendingAuthorization, Provider, StateStore};
use crate::tokens::TokenBackend;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Users keyed by email, with write counters.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<HashMap<String, LocalUser>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryUserRepository {
    /// Number of successful `create_user` + `update_user` calls.
    pub fn write_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        locked(&self.users).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, email: &str) -> Option<LocalUser> {
        locked(&self.users).get(email).cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<LocalUser>, AuthError> {
        Ok(self.get(email))
    }

    async fn create_user(&self, user: &LocalUser) -> Result<(), AuthError> {
        let mut users = locked(&self.users);
        if users.contains_key(&user.email) {
            return Err(AuthError::storage(format!(
                "duplicate key value violates unique constraint \"users_email_key\": {}",
                user.email
            )));
        }
        users.insert(user.email.clone(), user.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_user(&self, user: &LocalUser) -> Result<(), AuthError> {
        let mut users = locked(&self.users);
        match users.values_mut().find(|u| u.id == user.id) {
            Some(existing) => {
                *existing = user.clone();
                self.updates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(AuthError::storage(format!("no user with id {}", user.id))),
        }
    }
}

/// Sealed token blobs keyed by (user, provider).
#[derive(Default)]
pub struct MemoryTokenBackend {
    blobs: Mutex<HashMap<(String, Provider), String>>,
    fail_writes: AtomicBool,
}

impl MemoryTokenBackend {
    /// Make every subsequent `put_sealed` fail with `StorageFailure`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The sealed blob as stored.
    pub fn raw(&self, user_id: &str, provider: Provider) -> Option<String> {
        locked(&self.blobs)
            .get(&(user_id.to_string(), provider))
            .cloned()
    }

    pub fn len(&self) -> usize {
        locked(&self.blobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenBackend for MemoryTokenBackend {
    async fn put_sealed(
        &self,
        user_id: &str,
        provider: Provider,
        sealed: String,
    ) -> Result<(), AuthError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AuthError::storage("token backend unavailable"));
        }
        locked(&self.blobs).insert((user_id.to_string(), provider), sealed);
        Ok(())
    }

    async fn get_sealed(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<String>, AuthError> {
        Ok(self.raw(user_id, provider))
    }
}

/// Pending authorizations keyed by state. Expired entries are dropped on
/// every `save`, so abandoned logins do not accumulate.
#[derive(Default)]
pub struct MemoryStateStore {
    pending: Mutex<HashMap<String, PendingAuthorization>>,
}

impl MemoryStateStore {
    pub fn len(&self) -> usize {
        locked(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete attempts that expired at or before `now`. Returns the number removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut map = locked(&self.pending);
        let before = map.len();
        map.retain(|_, p| p.expires_at > now);
        before - map.len()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    /// A state that is still pending cannot be issued twice.
    async fn save(&self, pending: PendingAuthorization) -> Result<(), AuthError> {
        self.purge_expired(Utc::now());
        let mut map = locked(&self.pending);
        if map.contains_key(&pending.state) {
            return Err(AuthError::InvalidState);
        }
        map.insert(pending.state.clone(), pending);
        Ok(())
    }

    async fn take(&self, state: &str) -> Result<Option<PendingAuthorization>, AuthError> {
        Ok(locked(&self.pending).remove(state))
    }
}
