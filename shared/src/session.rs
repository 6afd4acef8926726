//! Session store over an injected key/value storage port
//!
//! The browser keeps the session in `localStorage`; native callers use a
//! file or in-memory backend. The store itself never touches global state.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Session, UserProfile};

/// Storage key holding the bearer token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Storage key holding the JSON profile
pub const USER_KEY: &str = "user";

/// Storage key holding demo-mode local registrations
pub const REGISTERED_USERS_KEY: &str = "registeredUsers";

/// Storage backend failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Corrupt stored value for {key}: {message}")]
    Corrupt { key: String, message: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Key/value port with `localStorage` semantics
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// In-process storage, used by tests and short-lived tools
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

impl<S: SessionStorage + ?Sized> SessionStorage for std::sync::Arc<S> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }
}

/// Profile as persisted under the `user` key
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    #[serde(flatten)]
    profile: UserProfile,
    #[serde(default)]
    logged_in_at: Option<chrono::DateTime<Utc>>,
}

/// Authentication state cached next to a storage backend
pub struct SessionStore<S: SessionStorage> {
    storage: S,
    current: RwLock<Option<Session>>,
}

impl<S: SessionStorage> SessionStore<S> {
    /// Create an empty store; nothing is read from storage
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            current: RwLock::new(None),
        }
    }

    /// Create a store and restore any persisted session.
    ///
    /// Fails when the backend cannot be read or cleared.
    pub fn open(storage: S) -> StorageResult<Self> {
        let store = Self::new(storage);
        store.restore()?;
        Ok(store)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Reload the session from storage.
    ///
    /// A token without a readable profile is treated as logged out and both
    /// keys are cleared.
    pub fn restore(&self) -> StorageResult<Option<Session>> {
        let token = self.storage.get_item(AUTH_TOKEN_KEY)?;
        let user = self.storage.get_item(USER_KEY)?;

        let session = match (token, user) {
            (Some(token), Some(user)) if !token.trim().is_empty() => {
                match serde_json::from_str::<StoredUser>(&user) {
                    Ok(stored) => Some(Session {
                        token,
                        profile: stored.profile,
                        created_at: stored.logged_in_at.unwrap_or_else(Utc::now),
                    }),
                    Err(_) => {
                        self.clear_storage()?;
                        None
                    }
                }
            }
            (None, None) => None,
            _ => {
                self.clear_storage()?;
                None
            }
        };

        self.set_current(session.clone());
        Ok(session)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Bearer token of the active session
    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.token.clone()))
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().ok().and_then(|s| s.clone())
    }

    /// Persist a new session, replacing any previous one
    pub fn login(&self, session: Session) -> StorageResult<()> {
        let stored = StoredUser {
            profile: session.profile.clone(),
            logged_in_at: Some(session.created_at),
        };
        let user = serde_json::to_string(&stored).map_err(|e| StorageError::Corrupt {
            key: USER_KEY.to_string(),
            message: e.to_string(),
        })?;

        self.storage.set_item(AUTH_TOKEN_KEY, &session.token)?;
        self.storage.set_item(USER_KEY, &user)?;
        self.set_current(Some(session));
        Ok(())
    }

    /// Destroy the session in storage, then in memory.
    ///
    /// The in-memory session survives a failed storage clear.
    pub fn logout(&self) -> StorageResult<()> {
        self.clear_storage()?;
        self.set_current(None);
        Ok(())
    }

    fn clear_storage(&self) -> StorageResult<()> {
        self.storage.remove_item(AUTH_TOKEN_KEY)?;
        self.storage.remove_item(USER_KEY)
    }

    fn set_current(&self, session: Option<Session>) {
        if let Ok(mut current) = self.current.write() {
            *current = session;
        }
    }
}
