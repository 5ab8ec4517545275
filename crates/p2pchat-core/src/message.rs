//! Message types for the P2PChat protocol

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// An encrypted, signed message as stored and relayed
///
/// Everything except `read` is fixed once the message is built. The relay
/// may fill in `sender_username` from its directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Content hash, see [`Message::content_id`]
    pub id: String,
    /// Sender's x-only public key (hex)
    pub sender: String,
    /// Sender's directory name, annotated by the relay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    /// Recipient's x-only public key (hex)
    pub recipient: String,
    /// Ciphertext in the active payload cipher encoding
    pub encrypted: String,
    /// Schnorr signature over SHA-256 of the plaintext (hex)
    pub signature: String,
    /// Creation time, Unix seconds
    pub timestamp: u64,
    /// Set by the recipient once read
    #[serde(default)]
    pub read: bool,
    /// Message this one replies to
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub parent_id: Option<String>,
}

/// Fields covered by the content hash, in hash order
#[derive(Serialize)]
struct CanonicalMessage<'a> {
    id: &'a str,
    sender: &'a str,
    recipient: &'a str,
    encrypted: &'a str,
    signature: &'a str,
    timestamp: u64,
    parent_id: &'a str,
}

impl Message {
    /// Canonical JSON the content hash is computed over
    ///
    /// The id is blanked, `read` and `sender_username` are left out and a
    /// missing parent is written as the empty string.
    pub fn canonical_json(&self) -> Result<Vec<u8>> {
        let canonical = CanonicalMessage {
            id: "",
            sender: &self.sender,
            recipient: &self.recipient,
            encrypted: &self.encrypted,
            signature: &self.signature,
            timestamp: self.timestamp,
            parent_id: self.parent_id.as_deref().unwrap_or_default(),
        };
        Ok(serde_json::to_vec(&canonical)?)
    }

    /// Hex SHA-256 of [`Message::canonical_json`]
    pub fn content_id(&self) -> Result<String> {
        let digest = Sha256::digest(self.canonical_json()?);
        Ok(hex::encode(digest))
    }

    /// Check that `id` matches the content
    pub fn verify_id(&self) -> Result<()> {
        let expected = self.content_id()?;
        if expected != self.id {
            return Err(Error::InvalidMessage(format!(
                "id {} does not match content hash {}",
                self.id, expected
            )));
        }
        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A decrypted message for display
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePlain {
    /// Message id
    pub id: String,
    /// Sender's public key (hex)
    pub sender: String,
    /// Sender's directory name, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    /// Recipient's public key (hex)
    pub recipient: String,
    /// Decrypted text
    pub content: String,
    /// Creation time, Unix seconds
    pub timestamp: u64,
    /// Read flag
    pub read: bool,
    /// Message this one replies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl MessagePlain {
    /// Pair a message with its decrypted content
    pub fn from_message(message: &Message, content: String) -> Self {
        Self {
            id: message.id.clone(),
            sender: message.sender.clone(),
            sender_username: message.sender_username.clone(),
            recipient: message.recipient.clone(),
            content,
            timestamp: message.timestamp,
            read: message.read,
            parent_id: message.parent_id.clone(),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
