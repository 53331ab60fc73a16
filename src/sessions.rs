//! Session registry
//!
//! Read-only view of the live audio sessions known to the host. The web API
//! only ever lists the keys; the audio backend owns adding and removing them.

use parking_lot::RwLock;
use std::collections::BTreeSet;

/// Reserved key for the master output volume, always present
pub const MASTER_SESSION_KEY: &str = "master";

/// Source of the current session keys
pub trait SessionRegistry: Send + Sync {
    /// Keys of all currently known sessions
    fn session_keys(&self) -> Vec<String>;
}

/// Thread-safe in-memory session registry
#[derive(Debug)]
pub struct SessionMap {
    keys: RwLock<BTreeSet<String>>,
}

impl SessionMap {
    /// Create a registry holding only the master session
    pub fn new() -> Self {
        let mut keys = BTreeSet::new();
        keys.insert(MASTER_SESSION_KEY.to_string());
        Self {
            keys: RwLock::new(keys),
        }
    }

    /// Register a session key. Returns false if it was already known
    pub fn add(&self, key: impl Into<String>) -> bool {
        self.keys.write().insert(key.into())
    }

    /// Forget a session key. The master session cannot be removed
    pub fn remove(&self, key: &str) -> bool {
        if key == MASTER_SESSION_KEY {
            return false;
        }
        self.keys.write().remove(key)
    }

    /// Drop every session except master
    pub fn clear(&self) {
        let mut keys = self.keys.write();
        keys.retain(|k| k == MASTER_SESSION_KEY);
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl Default for SessionMap {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Into<String>> FromIterator<S> for SessionMap {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let map = Self::new();
        for key in iter {
            map.add(key);
        }
        map
    }
}

impl SessionRegistry for SessionMap {
    fn session_keys(&self) -> Vec<String> {
        self.keys.read().iter().cloned().collect()
    }
}
