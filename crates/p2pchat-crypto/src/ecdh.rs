//! Pairwise shared secrets
//!
//! The secret for a pair of identities is the x-coordinate of
//! `my_private * their_public`. Public keys travel in x-only form, so the
//! point is always lifted with even y. The x-coordinate of `k*P` and `k*(-P)`
//! is the same, which keeps the secret symmetric even when one side's real
//! point has odd y.

use k256::ecdh::diffie_hellman;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};
use crate::keys::{PrivateKey, PublicKey};
use crate::KEY_SIZE;

/// SEC1 tag for a compressed point with even y
const EVEN_Y_TAG: u8 = 0x02;

/// A 32-byte symmetric key shared by two identities
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; KEY_SIZE]);

impl SharedSecret {
    /// Compute the secret between `my_private` and `their_public`
    pub fn derive(my_private: &PrivateKey, their_public: &PublicKey) -> Result<Self> {
        let mut sec1 = [0u8; KEY_SIZE + 1];
        sec1[0] = EVEN_Y_TAG;
        sec1[1..].copy_from_slice(their_public.as_bytes());

        let point = k256::PublicKey::from_sec1_bytes(&sec1)
            .map_err(|_| CryptoError::InvalidKey("peer key is not on the curve".to_string()))?;

        let shared = diffie_hellman(my_private.secret().to_nonzero_scalar(), point.as_affine());
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(shared.raw_secret_bytes());
        Ok(Self(bytes))
    }

    /// Create a shared secret from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the secret bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for SharedSecret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::OsEntropy;
    use crate::keys::KeyPair;
    use proptest::prelude::*;

    const PRIVATE_1: &str = "c687bf0179f2a038c04fa1d30abf23c7797c0bd65316ca2fee021a1f9241ad52";
    const PRIVATE_2: &str = "b5ecbb76d605b0d9025bf7cdd830bf9c01a0a1967d89462aa4016d7fe897f63e";

    #[test]
    fn test_known_pair_is_symmetric() {
        let a = KeyPair::from_private(PrivateKey::from_hex(PRIVATE_1).unwrap());
        let b = KeyPair::from_private(PrivateKey::from_hex(PRIVATE_2).unwrap());

        let ab = SharedSecret::derive(a.private_key(), b.public_key()).unwrap();
        let ba = SharedSecret::derive(b.private_key(), a.public_key()).unwrap();

        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_different_peers_give_different_secrets() {
        let me = KeyPair::generate_random(&OsEntropy).unwrap();
        let bob = KeyPair::generate_random(&OsEntropy).unwrap();
        let carol = KeyPair::generate_random(&OsEntropy).unwrap();

        let with_bob = SharedSecret::derive(me.private_key(), bob.public_key()).unwrap();
        let with_carol = SharedSecret::derive(me.private_key(), carol.public_key()).unwrap();

        assert_ne!(with_bob.as_bytes(), with_carol.as_bytes());
    }

    #[test]
    fn test_self_secret_is_deterministic() {
        let me = KeyPair::generate_random(&OsEntropy).unwrap();
        let first = SharedSecret::derive(me.private_key(), me.public_key()).unwrap();
        let second = SharedSecret::derive(me.private_key(), me.public_key()).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_shared_secret_symmetry(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
            let a = PrivateKey::from_bytes(&a);
            let b = PrivateKey::from_bytes(&b);
            prop_assume!(a.is_ok() && b.is_ok());
            let a = KeyPair::from_private(a.unwrap());
            let b = KeyPair::from_private(b.unwrap());

            let ab = SharedSecret::derive(a.private_key(), b.public_key()).unwrap();
            let ba = SharedSecret::derive(b.private_key(), a.public_key()).unwrap();
            prop_assert_eq!(ab.as_bytes(), ba.as_bytes());
        }
    }
}
