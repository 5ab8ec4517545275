//! Relay message storage

use std::collections::HashMap;

use p2pchat_core::Message;
use p2pchat_crypto::PublicKey;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{RelayError, Result};

/// Message store trait
///
/// Listings are ordered newest first; messages with the same timestamp are
/// ordered by id so results are stable.
pub trait MessageStore: Send + Sync {
    /// Store a message; returns `false` if the id was already present
    fn insert(&self, message: Message) -> Result<bool>;

    /// Fetch a message by id
    fn get(&self, id: &str) -> Result<Option<Message>>;

    /// Set the `read` flag and return the updated message
    fn set_read(&self, id: &str, read: bool) -> Result<Message>;

    /// All messages matching `filter`, in no particular order
    fn scan(&self, filter: &dyn Fn(&Message) -> bool) -> Result<Vec<Message>>;

    /// Number of stored messages
    fn count(&self) -> Result<usize>;

    /// Inbox of `recipient`
    fn for_recipient(&self, recipient: &PublicKey) -> Result<Vec<Message>> {
        let key = recipient.to_hex();
        self.scan(&|m: &Message| m.recipient == key).map(newest_first)
    }

    /// Messages `participant` sent or received
    fn for_participant(&self, participant: &PublicKey) -> Result<Vec<Message>> {
        let key = participant.to_hex();
        self.scan(&|m: &Message| m.recipient == key || m.sender == key)
            .map(newest_first)
    }

    /// Inbox of `recipient` filtered on the read flag
    fn for_recipient_with_read(&self, recipient: &PublicKey, read: bool) -> Result<Vec<Message>> {
        let key = recipient.to_hex();
        self.scan(&|m: &Message| m.recipient == key && m.read == read)
            .map(newest_first)
    }
}

fn newest_first(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
    messages
}

/// In-memory message storage (for testing)
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    messages: RwLock<HashMap<String, Message>>,
}

impl MemoryMessageStore {
    /// Create new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageStore for MemoryMessageStore {
    fn insert(&self, message: Message) -> Result<bool> {
        let mut messages = self.messages.write();
        if messages.contains_key(&message.id) {
            return Ok(false);
        }
        debug!(id = %message.id, "Stored message");
        messages.insert(message.id.clone(), message);
        Ok(true)
    }

    fn get(&self, id: &str) -> Result<Option<Message>> {
        Ok(self.messages.read().get(id).cloned())
    }

    fn set_read(&self, id: &str, read: bool) -> Result<Message> {
        let mut messages = self.messages.write();
        let message = messages
            .get_mut(id)
            .ok_or_else(|| RelayError::MessageNotFound(id.to_string()))?;
        message.read = read;
        Ok(message.clone())
    }

    fn scan(&self, filter: &dyn Fn(&Message) -> bool) -> Result<Vec<Message>> {
        Ok(self
            .messages
            .read()
            .values()
            .filter(|m| filter(*m))
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.messages.read().len())
    }
}

/// Sled-based persistent storage
///
/// Messages are stored as JSON under their id.
pub struct SledMessageStore {
    tree: sled::Tree,
}

impl SledMessageStore {
    /// Tree holding the messages
    pub const TREE: &'static str = "messages";

    /// Open the message tree of an existing database
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree(Self::TREE)?;
        Ok(Self { tree })
    }

    /// Open or create storage at path
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)?;
        Self::new(&db)
    }
}

impl MessageStore for SledMessageStore {
    fn insert(&self, message: Message) -> Result<bool> {
        let bytes = serde_json::to_vec(&message)?;
        let swapped = self
            .tree
            .compare_and_swap(message.id.as_bytes(), None as Option<&[u8]>, Some(bytes))?;
        if swapped.is_err() {
            return Ok(false);
        }
        self.tree.flush()?;
        debug!(id = %message.id, "Stored message");
        Ok(true)
    }

    fn get(&self, id: &str) -> Result<Option<Message>> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_read(&self, id: &str, read: bool) -> Result<Message> {
        let mut failure = None;
        let updated = self.tree.update_and_fetch(id.as_bytes(), |current| {
            let bytes = current?;
            match serde_json::from_slice::<Message>(bytes) {
                Ok(mut message) => {
                    message.read = read;
                    match serde_json::to_vec(&message) {
                        Ok(encoded) => Some(encoded),
                        Err(e) => {
                            failure = Some(e);
                            Some(bytes.to_vec())
                        }
                    }
                }
                Err(e) => {
                    failure = Some(e);
                    Some(bytes.to_vec())
                }
            }
        })?;
        if let Some(e) = failure {
            return Err(e.into());
        }

        let bytes = updated.ok_or_else(|| RelayError::MessageNotFound(id.to_string()))?;
        self.tree.flush()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn scan(&self, filter: &dyn Fn(&Message) -> bool) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            let message: Message = serde_json::from_slice(&bytes)?;
            if filter(&message) {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.tree.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p2pchat_core::Envelope;
    use p2pchat_crypto::{KeyPair, OsEntropy};

    fn pair() -> KeyPair {
        KeyPair::generate_random(&OsEntropy).unwrap()
    }

    fn message(from: &KeyPair, to: &KeyPair, text: &str, timestamp: u64) -> Message {
        Envelope::default()
            .build_at(
                from.private_key(),
                from.public_key(),
                to.public_key(),
                text,
                None,
                timestamp,
            )
            .unwrap()
    }

    fn exercise(store: &dyn MessageStore) {
        let alice = pair();
        let bob = pair();
        let carol = pair();

        let first = message(&alice, &bob, "first", 100);
        let second = message(&carol, &bob, "second", 300);
        let third = message(&bob, &alice, "third", 200);

        assert!(store.insert(first.clone()).unwrap());
        assert!(store.insert(second.clone()).unwrap());
        assert!(store.insert(third.clone()).unwrap());
        assert!(!store.insert(first.clone()).unwrap());
        assert_eq!(store.count().unwrap(), 3);

        assert_eq!(store.get(&first.id).unwrap(), Some(first.clone()));
        assert_eq!(store.get("missing").unwrap(), None);

        let inbox: Vec<_> = store
            .for_recipient(bob.public_key())
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(inbox, vec![second.id.clone(), first.id.clone()]);

        let every: Vec<_> = store
            .for_participant(bob.public_key())
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(every, vec![second.id.clone(), third.id.clone(), first.id.clone()]);

        let updated = store.set_read(&first.id, true).unwrap();
        assert!(updated.read);
        assert!(store.get(&first.id).unwrap().unwrap().read);

        let read = store.for_recipient_with_read(bob.public_key(), true).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].id, first.id);

        let unread = store.for_recipient_with_read(bob.public_key(), false).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, second.id);

        store.set_read(&first.id, false).unwrap();
        assert_eq!(store.for_recipient_with_read(bob.public_key(), true).unwrap().len(), 0);

        assert!(matches!(
            store.set_read("missing", true),
            Err(RelayError::MessageNotFound(_))
        ));
    }

    #[test]
    fn test_memory_storage() {
        exercise(&MemoryMessageStore::new());
    }

    #[test]
    fn test_sled_storage() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledMessageStore::open(dir.path().to_str().unwrap()).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_stored_message_keeps_valid_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledMessageStore::open(dir.path().to_str().unwrap()).unwrap();
        let alice = pair();
        let bob = pair();

        let original = message(&alice, &bob, "hello", 1);
        store.insert(original.clone()).unwrap();
        let read = store.set_read(&original.id, true).unwrap();
        assert!(read.verify_id().is_ok());
    }
}
