//! # P2PChat Cryptographic Library
//!
//! Cryptographic primitives for the P2PChat relayed messaging protocol.
//! Two parties only need each other's long-term secp256k1 public key: there
//! is no handshake and no session state.
//!
//! ## Core Components
//!
//! - [`keys`]: BIP39 mnemonics, BIP32 derivation and x-only key pairs
//! - [`ecdh`]: Pairwise shared secrets
//! - [`cipher`]: AES-256 payload encryption (padded CBC or CTR stream)
//! - [`signing`]: BIP340 Schnorr signatures over SHA-256 digests
//! - [`entropy`]: Injectable randomness

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod cipher;
pub mod ecdh;
pub mod entropy;
pub mod error;
pub mod keys;
pub mod signing;

pub use cipher::{CipherMode, PayloadCipher};
pub use ecdh::SharedSecret;
pub use entropy::{EntropySource, OsEntropy, SeededEntropy};
pub use error::{CryptoError, Result};
pub use keys::{KeyPair, Mnemonic, PrivateKey, PublicKey};
pub use signing::Signature;

/// Size of private keys, x-only public keys and shared secrets
pub const KEY_SIZE: usize = 32;

/// Bytes of entropy behind a 24-word mnemonic
pub const MNEMONIC_ENTROPY_SIZE: usize = 32;

/// BIP32 path from the mnemonic seed to the identity key
pub const DERIVATION_PATH: &str = "m/44'/1237'/0'/0/0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cipher::{CipherMode, PayloadCipher};
    pub use crate::ecdh::SharedSecret;
    pub use crate::entropy::{EntropySource, OsEntropy};
    pub use crate::error::{CryptoError, Result};
    pub use crate::keys::{KeyPair, Mnemonic, PrivateKey, PublicKey};
    pub use crate::signing::Signature;
}
