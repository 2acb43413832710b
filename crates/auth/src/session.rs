//! Session snapshot, the provider seam the guard reads through, and the
//! key-value token store contract.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Read access to the current session credentials.
///
/// Implementations must return a fresh view on every call: another component
/// may log out between two navigations.
pub trait SessionProvider {
    fn token(&self) -> Option<String>;
    fn role(&self) -> Option<String>;
}

impl<T: SessionProvider + ?Sized> SessionProvider for &T {
    fn token(&self) -> Option<String> {
        (**self).token()
    }

    fn role(&self) -> Option<String> {
        (**self).role()
    }
}

/// Point-in-time session credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub role: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(token: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            role: Some(role.into()),
        }
    }

    /// A blank or whitespace-only token counts as no token.
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

impl SessionProvider for Session {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn role(&self) -> Option<String> {
        self.role.clone()
    }
}

/// Keys the portal persists in its token store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKey {
    #[serde(rename = "token")]
    Token,
    #[serde(rename = "role")]
    Role,
    #[serde(rename = "userId")]
    UserId,
    #[serde(rename = "userEmail")]
    UserEmail,
    #[serde(rename = "loginLocation")]
    LoginLocation,
}

impl StorageKey {
    pub const ALL: [StorageKey; 5] = [
        StorageKey::Token,
        StorageKey::Role,
        StorageKey::UserId,
        StorageKey::UserEmail,
        StorageKey::LoginLocation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Token => "token",
            StorageKey::Role => "role",
            StorageKey::UserId => "userId",
            StorageKey::UserEmail => "userEmail",
            StorageKey::LoginLocation => "loginLocation",
        }
    }
}

impl core::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token store is corrupt: {0}")]
    Corrupt(String),

    #[error("token store lock poisoned")]
    Poisoned,
}

/// Persisted key-value store of session credentials.
///
/// Writers (login/logout flows) and readers (the guard) share one store. Every
/// `get` is a fresh read.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError>;

    /// Write several keys as one unit (token and role are always written together).
    fn set_many(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError>;

    /// Remove several keys as one unit.
    fn remove_many(&self, keys: &[StorageKey]) -> Result<(), StoreError>;

    /// Drop every stored key and write `entries`, as one update.
    fn replace_all(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError>;

    fn set(&self, key: StorageKey, value: String) -> Result<(), StoreError> {
        self.set_many(&[(key, value)])
    }

    fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        self.remove_many(&[key])
    }

    /// Read token and role as one snapshot.
    fn snapshot(&self) -> Result<Session, StoreError> {
        Ok(Session {
            token: self.get(StorageKey::Token)?,
            role: self.get(StorageKey::Role)?,
        })
    }
}

impl<S: TokenStore + ?Sized> TokenStore for std::sync::Arc<S> {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set_many(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError> {
        (**self).set_many(entries)
    }

    fn remove_many(&self, keys: &[StorageKey]) -> Result<(), StoreError> {
        (**self).remove_many(keys)
    }

    fn replace_all(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError> {
        (**self).replace_all(entries)
    }
}

/// In-process token store (tests, ephemeral sessions).
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<HashMap<StorageKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&key).cloned())
    }

    fn set_many(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        for (key, value) in entries {
            map.insert(*key, value.clone());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[StorageKey]) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    fn replace_all(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.clear();
        map.extend(entries.iter().cloned());
        Ok(())
    }
}

/// [`SessionProvider`] backed by a [`TokenStore`].
///
/// Store read failures are logged and surface as "absent", which the guard
/// turns into a redirect.
#[derive(Debug, Clone)]
pub struct StoreSessionProvider<S> {
    store: S,
}

impl<S: TokenStore> StoreSessionProvider<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read(&self, key: StorageKey) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "token store read failed; treating as absent");
                None
            }
        }
    }
}

impl<S: TokenStore> SessionProvider for StoreSessionProvider<S> {
    fn token(&self) -> Option<String> {
        self.read(StorageKey::Token)
    }

    fn role(&self) -> Option<String> {
        self.read(StorageKey::Role)
    }
}
