//! Last accepted nonce per identity

use dashmap::DashMap;
use p2pchat_crypto::PublicKey;
use tracing::debug;

use crate::error::{RelayError, Result};

/// Storage for the highest nonce accepted from each identity
///
/// Callers serialize `load` and `store` for a given key; implementations
/// only need to be safe for concurrent use across keys.
pub trait NonceStore: Send + Sync {
    /// Last accepted nonce, or `None` for an unknown identity
    fn load(&self, key: &PublicKey) -> Result<Option<u64>>;

    /// Record `nonce` as the last accepted one
    fn store(&self, key: &PublicKey, nonce: u64) -> Result<()>;
}

/// In-memory nonce store
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    nonces: DashMap<PublicKey, u64>,
}

impl MemoryNonceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities seen
    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    /// True if no identity has authenticated yet
    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }
}

impl NonceStore for MemoryNonceStore {
    fn load(&self, key: &PublicKey) -> Result<Option<u64>> {
        Ok(self.nonces.get(key).map(|entry| *entry.value()))
    }

    fn store(&self, key: &PublicKey, nonce: u64) -> Result<()> {
        self.nonces.insert(*key, nonce);
        Ok(())
    }
}

/// Sled-backed nonce store
///
/// Nonces are kept in their own tree as big-endian `u64` values keyed by
/// the raw 32-byte public key.
pub struct SledNonceStore {
    tree: sled::Tree,
}

impl SledNonceStore {
    /// Tree holding the nonce records
    pub const TREE: &'static str = "nonces";

    /// Open the nonce tree of an existing database
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree(Self::TREE)?;
        Ok(Self { tree })
    }

    /// Open or create a database at `path`
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)?;
        Self::new(&db)
    }
}

impl NonceStore for SledNonceStore {
    fn load(&self, key: &PublicKey) -> Result<Option<u64>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    RelayError::Storage(format!("corrupt nonce record for {}", key))
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    fn store(&self, key: &PublicKey, nonce: u64) -> Result<()> {
        self.tree.insert(key.as_bytes(), nonce.to_be_bytes().to_vec())?;
        self.tree.flush()?;
        debug!(key = %key, nonce, "Stored nonce");
        Ok(())
    }
}
