//! Identity keys for the P2PChat protocol
//!
//! Every participant is identified by a secp256k1 key pair:
//! - the private key is a scalar in `[1, n-1]`, exchanged as 64 hex characters
//! - the public key is the BIP340 x-only serialization, also 64 hex characters
//!
//! New identities come from a 24-word BIP39 mnemonic derived along
//! [`DERIVATION_PATH`], or directly from random bytes.

use std::fmt;
use std::str::FromStr;

use bip32::{DerivationPath, XPrv};
use k256::elliptic_curve::ops::Reduce;
use k256::{FieldBytes, NonZeroScalar, Scalar, SecretKey, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

pub use bip39::Mnemonic;

use crate::entropy::EntropySource;
use crate::error::{CryptoError, Result};
use crate::{DERIVATION_PATH, KEY_SIZE, MNEMONIC_ENTROPY_SIZE};

/// Draw 256 bits of entropy and encode them as a 24-word mnemonic
pub fn generate_mnemonic(entropy: &dyn EntropySource) -> Result<Mnemonic> {
    let mut bytes = Zeroizing::new([0u8; MNEMONIC_ENTROPY_SIZE]);
    entropy.fill_bytes(&mut bytes[..])?;
    Ok(Mnemonic::from_entropy(&bytes[..])?)
}

/// Parse and checksum-validate a space separated word list
pub fn mnemonic_from_words(words: &str) -> Result<Mnemonic> {
    Ok(words.trim().parse::<Mnemonic>()?)
}

/// Stretch a mnemonic into the 512-bit BIP39 seed
pub fn seed_from_mnemonic(mnemonic: &Mnemonic, passphrase: &str) -> Zeroizing<[u8; 64]> {
    Zeroizing::new(mnemonic.to_seed(passphrase))
}

/// Derive the identity private key from a BIP39 seed along [`DERIVATION_PATH`]
pub fn derive_private_key(seed: &[u8]) -> Result<PrivateKey> {
    let path = DerivationPath::from_str(DERIVATION_PATH)?;
    let xprv = XPrv::derive_from_path(seed, &path)?;
    let bytes = Zeroizing::new(xprv.to_bytes());
    PrivateKey::from_bytes(&bytes[..])
        .map_err(|e| CryptoError::Derivation(e.to_string()))
}

/// A secp256k1 private key
///
/// The underlying scalar is wiped when the key is dropped.
#[derive(Clone)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    /// Create from 32 big-endian bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidKey("scalar out of range".to_string()))?;
        Ok(Self { secret })
    }

    /// Parse the 64 character hex form
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = Zeroizing::new(hex::decode(hex_str.trim())?);
        Self::from_bytes(&bytes)
    }

    /// Generate a key directly from random bytes
    ///
    /// 32 random bytes are reduced modulo the curve order; a zero result is
    /// discarded and redrawn.
    pub fn random(entropy: &dyn EntropySource) -> Result<Self> {
        loop {
            let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
            entropy.fill_bytes(&mut bytes[..])?;
            let scalar = <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(&bytes[..]));
            if let Some(non_zero) = Option::<NonZeroScalar>::from(NonZeroScalar::new(scalar)) {
                return Ok(Self {
                    secret: SecretKey::from(non_zero),
                });
            }
            debug!("Discarding zero scalar");
        }
    }

    /// Compute the x-only public key
    pub fn public_key(&self) -> PublicKey {
        let signing_key = self.schnorr_key();
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&signing_key.verifying_key().to_bytes());
        PublicKey(bytes)
    }

    /// Hex encoding of the secret scalar
    ///
    /// # Security Warning
    /// This exposes the secret key. Only use it for export and make sure the
    /// result is handled accordingly.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.secret.to_bytes()))
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub(crate) fn schnorr_key(&self) -> k256::schnorr::SigningKey {
        k256::schnorr::SigningKey::from(self.secret.to_nonzero_scalar())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// A BIP340 x-only public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    /// Create from the 32 byte x-coordinate, checking it lies on the curve
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key = k256::schnorr::VerifyingKey::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidKey("not an x-only secp256k1 point".to_string()))?;
        let mut out = [0u8; KEY_SIZE];
        out.copy_from_slice(&key.to_bytes());
        Ok(Self(out))
    }

    /// Parse the 64 character hex form
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim())?;
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        Self::from_bytes(&bytes)
    }

    /// Raw x-coordinate
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub(crate) fn verifying_key(&self) -> Result<k256::schnorr::VerifyingKey> {
        k256::schnorr::VerifyingKey::from_bytes(&self.0)
            .map_err(|_| CryptoError::InvalidKey("not an x-only secp256k1 point".to_string()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_hex()
    }
}

/// A private key together with its public key
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Wrap an existing private key
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// Derive the identity for a mnemonic (empty passphrase)
    pub fn from_mnemonic(mnemonic: &Mnemonic) -> Result<Self> {
        let seed = seed_from_mnemonic(mnemonic, "");
        Ok(Self::from_private(derive_private_key(&seed[..])?))
    }

    /// Generate a fresh identity along with the mnemonic that recovers it
    pub fn generate(entropy: &dyn EntropySource) -> Result<(Mnemonic, Self)> {
        let mnemonic = generate_mnemonic(entropy)?;
        let pair = Self::from_mnemonic(&mnemonic)?;
        debug!(public_key = %pair.public, "Generated identity from mnemonic");
        Ok((mnemonic, pair))
    }

    /// Generate a fresh identity without a recovery phrase
    pub fn generate_random(entropy: &dyn EntropySource) -> Result<Self> {
        Ok(Self::from_private(PrivateKey::random(entropy)?))
    }

    /// The private half
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// The public half
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}
