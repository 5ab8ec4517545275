//! Error types for cryptographic operations

use thiserror::Error;

/// Result type alias for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The randomness source could not produce bytes
    #[error("Entropy source unavailable: {0}")]
    Entropy(String),

    /// Hierarchical key derivation failed
    #[error("Key derivation failed: {0}")]
    Derivation(String),

    /// Malformed or out-of-range key material
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Word list is not a valid BIP39 mnemonic
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Ciphertext encoding could not be parsed
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Stream ciphertext shorter than the IV prefix
    #[error("Ciphertext too short: {len} bytes, need at least {min}")]
    ShortCiphertext {
        /// Decoded ciphertext length
        len: usize,
        /// Minimum length, the IV size
        min: usize,
    },

    /// Decryption produced an invalid result
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Signature did not verify or could not be parsed
    #[error("Invalid signature")]
    InvalidSignature,
}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidKey(err.to_string())
    }
}

impl From<bip32::Error> for CryptoError {
    fn from(err: bip32::Error) -> Self {
        CryptoError::Derivation(err.to_string())
    }
}

impl From<bip39::Error> for CryptoError {
    fn from(err: bip39::Error) -> Self {
        CryptoError::InvalidMnemonic(err.to_string())
    }
}

impl From<rand::Error> for CryptoError {
    fn from(err: rand::Error) -> Self {
        CryptoError::Entropy(err.to_string())
    }
}
