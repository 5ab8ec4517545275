//! # P2PChat Core
//!
//! Message model and the envelope protocol for P2PChat.
//!
//! This crate provides:
//! - The relayed [`Message`] record and its content-addressed id
//! - [`Envelope`] for encrypting, signing and addressing outgoing text
//! - [`Verifier`] for opening messages in either direction
//! - Username and well-known directory types

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod directory;
pub mod envelope;
pub mod error;
pub mod message;
pub mod verifier;

pub use directory::{parse_username, UserWellKnown, Username};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use message::{Message, MessagePlain};
pub use verifier::{Direction, Verifier};

/// Maximum plaintext size accepted by the client (64 KB)
pub const MAX_MESSAGE_SIZE: usize = 65536;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::directory::{UserWellKnown, Username};
    pub use crate::envelope::Envelope;
    pub use crate::error::{Error, Result};
    pub use crate::message::{Message, MessagePlain};
    pub use crate::verifier::{Direction, Verifier};
}
