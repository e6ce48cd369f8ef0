//! Anonymous shopper identity.
//!
//! A guest cart is keyed by a client-generated session identifier kept in
//! durable client storage under [`SESSION_STORAGE_KEY`]. The identifier is
//! created lazily on first use and removed once the guest cart has been
//! merged into a signed-in user's cart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rand::Rng;

use crate::error::SessionError;

pub const SESSION_STORAGE_KEY: &str = "cart_session_id";

const SESSION_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Durable single-key client storage.
pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing storage cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing storage cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Stores keys in a small JSON object on disk. A missing file is an empty
/// store.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, values: &HashMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

/// Process-local store, for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Hands out the guest session identifier, creating and persisting one on
/// first use.
#[derive(Debug)]
pub struct SessionResolver<S> {
    store: S,
}

impl<S: SessionStore> SessionResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the stored identifier, or generates and stores a new one.
    ///
    /// Storage failures are logged; the caller always gets an identifier,
    /// even if it could not be persisted.
    pub fn session_id(&self) -> String {
        if let Some(existing) = self.stored() {
            return existing;
        }

        let session_id = generate_session_id();
        if let Err(e) = self.store.save(SESSION_STORAGE_KEY, &session_id) {
            tracing::warn!(error = %e, "failed to persist cart session id");
        }
        session_id
    }

    /// The stored identifier, without generating one.
    pub fn stored(&self) -> Option<String> {
        match self.store.load(SESSION_STORAGE_KEY) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cart session id");
                None
            }
        }
    }

    /// Forgets the identifier; the next [`Self::session_id`] call makes a new one.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(SESSION_STORAGE_KEY) {
            tracing::warn!(error = %e, "failed to remove cart session id");
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// `session_<unix-millis>_<9 lowercase base-36 chars>`.
#[must_use]
pub fn generate_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect();
    format!("session_{millis}_{suffix}")
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
