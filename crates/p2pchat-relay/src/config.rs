//! Relay configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Server configuration for running a relay
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayServerConfig {
    /// Listen address
    pub listen_address: String,
    /// Domain this relay serves usernames for
    pub domain: String,
    /// JSON file with the registered users
    pub users_file: Option<String>,
    /// Sled database path; in-memory storage when unset
    pub storage_path: Option<String>,
    /// Maximum accepted request body in bytes
    pub max_message_size: usize,
}

impl Default for RelayServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:8080".to_string(),
            domain: "localhost:8080".to_string(),
            users_file: None,
            storage_path: None,
            max_message_size: crate::DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl RelayServerConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self =
            serde_json::from_str(&json).map_err(|e| RelayError::Config(e.to_string()))?;
        config.validate().map_err(RelayError::Config)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.listen_address.is_empty() {
            return Err("listen_address must be set".to_string());
        }
        if self.domain.is_empty() || self.domain.contains('@') {
            return Err("domain must be a non-empty host".to_string());
        }
        if self.max_message_size == 0 {
            return Err("max_message_size must be > 0".to_string());
        }
        Ok(())
    }
}
