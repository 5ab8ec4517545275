//! Relay service implementation

use std::sync::Arc;

use p2pchat_core::{Message, UserWellKnown};
use p2pchat_crypto::PublicKey;
use p2pchat_relay::{
    AuthHeaders, MemoryMessageStore, MemoryNonceStore, MessageStore, RelayError,
    RelayServerConfig, ReplayGuard, RequestParts, SledMessageStore, SledNonceStore,
    UserDirectory,
};
use tracing::{debug, info, instrument};

use crate::error::ServiceError;

/// Which messages of a user to list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listing {
    /// Received messages
    Inbox,
    /// Sent or received
    Every,
    /// Received and marked read
    Read,
    /// Received and not yet read
    Unread,
}

/// Relay service implementation
pub struct RelayService {
    guard: ReplayGuard,
    store: Arc<dyn MessageStore>,
    directory: UserDirectory,
    domain: String,
}

impl RelayService {
    /// Create a service from its parts
    pub fn new(
        guard: ReplayGuard,
        store: Arc<dyn MessageStore>,
        directory: UserDirectory,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            guard,
            store,
            directory,
            domain: domain.into(),
        }
    }

    /// In-memory service, used when no storage path is configured
    pub fn in_memory(directory: UserDirectory, domain: impl Into<String>) -> Self {
        Self::new(
            ReplayGuard::new(Arc::new(MemoryNonceStore::new())),
            Arc::new(MemoryMessageStore::new()),
            directory,
            domain,
        )
    }

    /// Build the service described by `config`
    pub fn from_config(config: &RelayServerConfig) -> Result<Self, RelayError> {
        let directory = match &config.users_file {
            Some(path) => UserDirectory::load(path)?,
            None => UserDirectory::default(),
        };

        match &config.storage_path {
            Some(path) => {
                let db = sled::open(path)?;
                info!(path = %path, "Opened relay database");
                Ok(Self::new(
                    ReplayGuard::new(Arc::new(SledNonceStore::new(&db)?)),
                    Arc::new(SledMessageStore::new(&db)?),
                    directory,
                    config.domain.clone(),
                ))
            }
            None => {
                info!("Using in-memory storage");
                Ok(Self::in_memory(directory, config.domain.clone()))
            }
        }
    }

    /// Domain usernames are served for
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Number of stored messages
    pub fn message_count(&self) -> Result<usize, ServiceError> {
        Ok(self.store.count()?)
    }

    /// Directory record for `username`
    pub fn well_known(&self, username: &str) -> Result<UserWellKnown, ServiceError> {
        self.directory
            .lookup(username)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", username)))
    }

    /// Accept a message for storage
    ///
    /// The relay cannot read the payload, so it only checks that both keys
    /// are well formed and that the id matches the content. Returns the stored
    /// message and whether it was new.
    #[instrument(skip(self, message), fields(id = %message.id))]
    pub fn forward(&self, mut message: Message) -> Result<(Message, bool), ServiceError> {
        let sender = canonical_key(&message.sender, "sender")?;
        canonical_key(&message.recipient, "recipient")?;
        message.verify_id()?;

        message.sender_username = self
            .directory
            .username_for(&sender)
            .map(|user| format!("{}@{}", user, self.domain));
        message.read = false;

        let created = self.store.insert(message.clone())?;
        if created {
            info!(recipient = %message.recipient, "Message forwarded");
        } else {
            debug!("Duplicate message ignored");
        }
        Ok((message, created))
    }

    /// Authenticate a request, returning the caller's key
    pub fn authenticate(
        &self,
        headers: &AuthHeaders,
        request: &RequestParts<'_>,
    ) -> Result<PublicKey, ServiceError> {
        Ok(self.guard.authenticate(headers, request)?)
    }

    /// List `owner`'s messages for an authenticated `caller`
    pub fn messages(
        &self,
        caller: &PublicKey,
        owner: &str,
        listing: Listing,
    ) -> Result<Vec<Message>, ServiceError> {
        let owner = PublicKey::from_hex(owner)
            .map_err(|e| ServiceError::BadRequest(e.to_string()))?;
        if owner != *caller {
            return Err(RelayError::Forbidden("cannot list another user's messages".to_string()).into());
        }

        let messages = match listing {
            Listing::Inbox => self.store.for_recipient(&owner)?,
            Listing::Every => self.store.for_participant(&owner)?,
            Listing::Read => self.store.for_recipient_with_read(&owner, true)?,
            Listing::Unread => self.store.for_recipient_with_read(&owner, false)?,
        };
        debug!(count = messages.len(), ?listing, "Listed messages");
        Ok(messages)
    }

    /// Flip the read flag; only the recipient may do this
    pub fn set_read(&self, caller: &PublicKey, id: &str, read: bool) -> Result<Message, ServiceError> {
        let message = self
            .store
            .get(id)?
            .ok_or_else(|| RelayError::MessageNotFound(id.to_string()))?;
        if message.recipient != caller.to_hex() {
            return Err(RelayError::Forbidden("only the recipient can mark a message".to_string()).into());
        }
        Ok(self.store.set_read(id, read)?)
    }
}

/// Parse a hex key and require its lowercase form, so store lookups match
fn canonical_key(hex: &str, field: &str) -> Result<PublicKey, ServiceError> {
    let key = PublicKey::from_hex(hex)
        .map_err(|e| ServiceError::BadRequest(format!("{}: {}", field, e)))?;
    if key.to_hex() != hex {
        return Err(ServiceError::BadRequest(format!("{} key must be lowercase hex", field)));
    }
    Ok(key)
}
