//! Registered users of a relay domain

use std::collections::HashMap;
use std::path::Path;

use p2pchat_core::UserWellKnown;
use p2pchat_crypto::PublicKey;
use tracing::info;

use crate::error::{RelayError, Result};

/// Users served by this relay, indexed by name and key
#[derive(Clone, Debug, Default)]
pub struct UserDirectory {
    by_name: HashMap<String, UserWellKnown>,
    by_key: HashMap<PublicKey, String>,
}

impl UserDirectory {
    /// Build a directory from entries
    ///
    /// Duplicate usernames are rejected.
    pub fn from_entries(entries: Vec<UserWellKnown>) -> Result<Self> {
        let mut directory = Self::default();
        for entry in entries {
            if directory.by_name.contains_key(&entry.username) {
                return Err(RelayError::Config(format!(
                    "duplicate username: {}",
                    entry.username
                )));
            }
            directory
                .by_key
                .insert(entry.public_key, entry.username.clone());
            directory.by_name.insert(entry.username.clone(), entry);
        }
        Ok(directory)
    }

    /// Parse a JSON array of entries
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<UserWellKnown> =
            serde_json::from_str(json).map_err(|e| RelayError::Config(e.to_string()))?;
        Self::from_entries(entries)
    }

    /// Load a JSON array of entries from `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))?;
        let directory = Self::from_json(&json)?;
        info!(users = directory.len(), path = %path.display(), "Loaded user directory");
        Ok(directory)
    }

    /// Entry for `username`
    pub fn lookup(&self, username: &str) -> Option<&UserWellKnown> {
        self.by_name.get(username)
    }

    /// Username registered for `key`
    pub fn username_for(&self, key: &PublicKey) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True if no users are registered
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
