//! Opening received (or previously sent) messages
//!
//! The payload key is the shared secret between sender and recipient, so the
//! peer used to recompute it depends on which side is opening the message.

use p2pchat_crypto::{CryptoError, PayloadCipher, PrivateKey, PublicKey, SharedSecret, Signature};
use tracing::debug;

use crate::error::Result;
use crate::message::{Message, MessagePlain};

/// Which side of a message the local identity is on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// I sent this message; the peer is its recipient
    Outgoing {
        /// The recipient
        peer: PublicKey,
    },
    /// I received this message; the peer is its sender
    Incoming {
        /// The sender
        peer: PublicKey,
    },
}

impl Direction {
    /// Classify `message` from the point of view of `me`
    pub fn of(me: &PublicKey, message: &Message) -> Result<Self> {
        let sender = PublicKey::from_hex(&message.sender)?;
        if sender == *me {
            let recipient = PublicKey::from_hex(&message.recipient)?;
            Ok(Direction::Outgoing { peer: recipient })
        } else {
            Ok(Direction::Incoming { peer: sender })
        }
    }

    /// Key to compute the shared secret against
    pub fn peer(&self) -> &PublicKey {
        match self {
            Direction::Outgoing { peer } | Direction::Incoming { peer } => peer,
        }
    }
}

/// Decrypts messages and checks their signatures
#[derive(Clone, Debug, Default)]
pub struct Verifier {
    cipher: PayloadCipher,
}

impl Verifier {
    /// Create a verifier for payloads sealed with `cipher`'s mode
    pub fn new(cipher: PayloadCipher) -> Self {
        Self { cipher }
    }

    /// Decrypt `message` and verify it was signed by its sender
    ///
    /// Plaintext is only returned once the signature checks out.
    pub fn open(&self, my_private: &PrivateKey, message: &Message) -> Result<String> {
        let me = my_private.public_key();
        let direction = Direction::of(&me, message)?;
        let secret = SharedSecret::derive(my_private, direction.peer())?;

        let plaintext = self.cipher.open(&message.encrypted, &secret)?;

        let sender = PublicKey::from_hex(&message.sender)?;
        let signature = Signature::from_hex(&message.signature)?;
        if let Err(err) = sender.verify(&plaintext, &signature) {
            debug!(id = %message.id, "Signature check failed");
            return Err(err.into());
        }

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Decryption("plaintext is not UTF-8".to_string()).into())
    }

    /// Open every message, failing on the first one that does not verify
    pub fn open_all(
        &self,
        my_private: &PrivateKey,
        messages: &[Message],
    ) -> Result<Vec<MessagePlain>> {
        messages
            .iter()
            .map(|message| {
                let content = self.open(my_private, message)?;
                Ok(MessagePlain::from_message(message, content))
            })
            .collect()
    }
}
