//! BIP340 Schnorr signatures
//!
//! Messages are never signed directly: the signature always covers
//! `SHA-256(message)`.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, Result};
use crate::keys::{PrivateKey, PublicKey};

/// Length of a serialized signature
pub const SIGNATURE_SIZE: usize = 64;

/// A 64-byte Schnorr signature, hex encoded on the wire
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    /// Parse raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SIGNATURE_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(array))
    }

    /// Parse the 128 character hex form
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| CryptoError::InvalidSignature)?;
        Self::from_bytes(&bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl FromStr for Signature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Signature {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.to_hex()
    }
}

impl PrivateKey {
    /// Sign `SHA-256(message)`
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let digest = Sha256::digest(message);
        let signature: k256::schnorr::Signature = self
            .schnorr_key()
            .sign_prehash(&digest)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(Signature(signature.to_bytes()))
    }
}

impl PublicKey {
    /// Check a signature over `SHA-256(message)`
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let digest = Sha256::digest(message);
        let signature = k256::schnorr::Signature::try_from(&signature.0[..])
            .map_err(|_| CryptoError::InvalidSignature)?;
        self.verifying_key()
            .map_err(|_| CryptoError::InvalidSignature)?
            .verify_prehash(&digest, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}
