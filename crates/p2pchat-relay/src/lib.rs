//! # P2PChat Relay
//!
//! Relay-side building blocks. The relay stores and serves messages it can
//! never read: it checks content ids, not signatures over plaintext.
//!
//! ## Features
//!
//! - **Replay protection**: [`ReplayGuard`] authenticates requests and
//!   rejects reused nonces per identity
//! - **Message storage**: in-memory and sled-backed [`MessageStore`]s
//! - **User directory**: well-known records for the relay's domain

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod nonce;
pub mod signer;
pub mod storage;

pub use auth::{canonical_request, AuthHeaders, ReplayGuard, RequestParts};
pub use config::RelayServerConfig;
pub use directory::UserDirectory;
pub use error::{AuthError, RelayError, Result};
pub use nonce::{MemoryNonceStore, NonceStore, SledNonceStore};
pub use signer::RequestSigner;
pub use storage::{MemoryMessageStore, MessageStore, SledMessageStore};

/// Default maximum request body (1 MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;
