//! Relay error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;

/// Request authentication failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A required header was absent
    #[error("Missing header: {0}")]
    Missing(&'static str),

    /// Nonce header absent or not a decimal u64
    #[error("Invalid nonce")]
    BadNonce,

    /// Nonce not greater than the last accepted one
    #[error("Nonce already used")]
    Replay,

    /// Signature, key or canonical string did not verify
    #[error("Invalid request signature")]
    BadSignature,
}

/// Relay errors
#[derive(Debug, Error)]
pub enum RelayError {
    /// Request authentication failed
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Message not found
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Authenticated caller may not touch this resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Message failed relay-side checks
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Configuration or directory file problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// Core protocol error
    #[error(transparent)]
    Core(#[from] p2pchat_core::Error),
}

impl From<sled::Error> for RelayError {
    fn from(err: sled::Error) -> Self {
        RelayError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Storage(err.to_string())
    }
}

impl From<p2pchat_crypto::CryptoError> for RelayError {
    fn from(err: p2pchat_crypto::CryptoError) -> Self {
        RelayError::Core(err.into())
    }
}
