//! Building signed, content-addressed messages

use p2pchat_crypto::{CryptoError, PayloadCipher, PrivateKey, PublicKey, SharedSecret};
use tracing::debug;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::MAX_MESSAGE_SIZE;

/// Seals plaintext into [`Message`]s
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    cipher: PayloadCipher,
}

impl Envelope {
    /// Create an envelope builder using `cipher` for payloads
    pub fn new(cipher: PayloadCipher) -> Self {
        Self { cipher }
    }

    /// The payload cipher in use
    pub fn cipher(&self) -> &PayloadCipher {
        &self.cipher
    }

    /// Build a message stamped with the current time
    pub fn build(
        &self,
        sender_private: &PrivateKey,
        sender_public: &PublicKey,
        recipient_public: &PublicKey,
        plaintext: &str,
        parent_id: Option<&str>,
    ) -> Result<Message> {
        let timestamp = unix_seconds(chrono::Utc::now().timestamp())?;
        self.build_at(
            sender_private,
            sender_public,
            recipient_public,
            plaintext,
            parent_id,
            timestamp,
        )
    }

    /// Build a message with an explicit timestamp
    ///
    /// The id is computed last, over every other field.
    pub fn build_at(
        &self,
        sender_private: &PrivateKey,
        sender_public: &PublicKey,
        recipient_public: &PublicKey,
        plaintext: &str,
        parent_id: Option<&str>,
        timestamp: u64,
    ) -> Result<Message> {
        if plaintext.len() > MAX_MESSAGE_SIZE {
            return Err(Error::MessageTooLarge {
                size: plaintext.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        if sender_private.public_key() != *sender_public {
            return Err(CryptoError::InvalidKey(
                "sender public key does not belong to the private key".to_string(),
            )
            .into());
        }

        let secret = SharedSecret::derive(sender_private, recipient_public)?;
        let encrypted = self.cipher.seal(plaintext.as_bytes(), &secret)?;
        let signature = sender_private.sign(plaintext.as_bytes())?;

        let mut message = Message {
            id: String::new(),
            sender: sender_public.to_hex(),
            sender_username: None,
            recipient: recipient_public.to_hex(),
            encrypted,
            signature: signature.to_hex(),
            timestamp,
            read: false,
            parent_id: parent_id.filter(|p| !p.is_empty()).map(str::to_string),
        };
        message.id = message.content_id()?;

        debug!(
            id = %message.id,
            recipient = %message.recipient,
            mode = %self.cipher.mode(),
            "Built message"
        );
        Ok(message)
    }
}

/// Seconds since the epoch as a message timestamp
fn unix_seconds(seconds: i64) -> Result<u64> {
    u64::try_from(seconds)
        .map_err(|_| Error::InvalidMessage(format!("clock is before the unix epoch: {}", seconds)))
}
