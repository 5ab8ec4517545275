//! Payload encryption under a pairwise shared secret
//!
//! Two AES-256 constructions exist and are kept apart by name:
//!
//! - **Padded**: CBC with a random IV. Short messages get up to 229 extra
//!   random padding bytes so the ciphertext length says little about the
//!   plaintext length. Encoded as `base64(ct) ?iv= base64(iv)`.
//! - **Stream**: CTR with a random IV, no padding, raw `iv || ct`.
//!
//! A [`PayloadCipher`] is bound to exactly one [`CipherMode`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};
use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::ecdh::SharedSecret;
use crate::entropy::{EntropySource, OsEntropy};
use crate::error::{CryptoError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// AES block and IV size
pub const IV_SIZE: usize = 16;

/// Separator between ciphertext and IV in the padded encoding
pub const IV_DELIMITER: &str = "?iv=";

/// Plaintexts shorter than this receive extra random padding
pub const SHORT_MESSAGE_THRESHOLD: usize = 100;

/// Extra padding is drawn uniformly from `[0, MAX_EXTRA_PADDING)`
pub const MAX_EXTRA_PADDING: usize = 230;

/// Encrypt with AES-256-CBC and length-obscuring padding
pub fn encrypt_padded(
    plaintext: &[u8],
    key: &SharedSecret,
    entropy: &dyn EntropySource,
) -> Result<String> {
    let mut iv = [0u8; IV_SIZE];
    entropy.fill_bytes(&mut iv)?;

    let extra = if plaintext.len() < SHORT_MESSAGE_THRESHOLD {
        entropy.below(MAX_EXTRA_PADDING)?
    } else {
        0
    };
    let pad = IV_SIZE - (plaintext.len() + extra) % IV_SIZE;
    let total = pad + extra;
    let fill = u8::try_from(total)
        .map_err(|_| CryptoError::Encryption(format!("padding of {} bytes", total)))?;

    let mut buf = Vec::with_capacity(plaintext.len() + total);
    buf.extend_from_slice(plaintext);
    buf.resize(plaintext.len() + total, fill);
    let len = buf.len();

    Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .map_err(|_| CryptoError::Encryption("buffer not block aligned".to_string()))?;

    Ok(format!(
        "{}{}{}",
        STANDARD.encode(&buf),
        IV_DELIMITER,
        STANDARD.encode(iv)
    ))
}

/// Reverse [`encrypt_padded`]
pub fn decrypt_padded(encoded: &str, key: &SharedSecret) -> Result<Vec<u8>> {
    let (ct_b64, iv_b64) = encoded
        .split_once(IV_DELIMITER)
        .ok_or_else(|| CryptoError::MalformedCiphertext("missing IV delimiter".to_string()))?;

    let mut buf = STANDARD
        .decode(ct_b64)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("ciphertext: {}", e)))?;
    let iv = STANDARD
        .decode(iv_b64)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("iv: {}", e)))?;

    if iv.len() != IV_SIZE {
        return Err(CryptoError::MalformedCiphertext(format!(
            "iv is {} bytes",
            iv.len()
        )));
    }
    if buf.is_empty() || buf.len() % IV_SIZE != 0 {
        return Err(CryptoError::MalformedCiphertext(format!(
            "ciphertext is {} bytes",
            buf.len()
        )));
    }

    Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| CryptoError::Decryption("buffer not block aligned".to_string()))?;

    let total = buf.last().copied().unwrap_or_default() as usize;
    if total == 0 || total > buf.len() {
        return Err(CryptoError::Decryption("invalid padding length".to_string()));
    }
    let body = buf.len() - total;
    if buf[body..].iter().any(|&b| b as usize != total) {
        return Err(CryptoError::Decryption("inconsistent padding".to_string()));
    }

    buf.truncate(body);
    Ok(buf)
}

/// Encrypt with AES-256-CTR, returning `iv || ct`
pub fn encrypt_stream(
    plaintext: &[u8],
    key: &SharedSecret,
    entropy: &dyn EntropySource,
) -> Result<Vec<u8>> {
    let mut out = vec![0u8; IV_SIZE + plaintext.len()];
    entropy.fill_bytes(&mut out[..IV_SIZE])?;
    out[IV_SIZE..].copy_from_slice(plaintext);

    let (iv, body) = out.split_at_mut(IV_SIZE);
    Aes256Ctr::new_from_slices(key.as_bytes(), iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?
        .apply_keystream(body);

    Ok(out)
}

/// Reverse [`encrypt_stream`]
pub fn decrypt_stream(data: &[u8], key: &SharedSecret) -> Result<Vec<u8>> {
    if data.len() < IV_SIZE {
        return Err(CryptoError::ShortCiphertext {
            len: data.len(),
            min: IV_SIZE,
        });
    }

    let (iv, ct) = data.split_at(IV_SIZE);
    let mut buf = ct.to_vec();
    Aes256Ctr::new_from_slices(key.as_bytes(), iv)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?
        .apply_keystream(&mut buf);

    Ok(buf)
}

/// Payload cipher selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherMode {
    /// AES-256-CBC with random padding (deployed default)
    #[default]
    Padded,
    /// AES-256-CTR without padding
    Stream,
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherMode::Padded => f.write_str("padded"),
            CipherMode::Stream => f.write_str("stream"),
        }
    }
}

impl FromStr for CipherMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "padded" => Ok(CipherMode::Padded),
            "stream" => Ok(CipherMode::Stream),
            other => Err(format!("unknown cipher mode: {}", other)),
        }
    }
}

/// Encrypts the `encrypted` field of messages in a single mode
#[derive(Clone)]
pub struct PayloadCipher {
    mode: CipherMode,
    entropy: Arc<dyn EntropySource>,
}

impl PayloadCipher {
    /// Create a cipher with an explicit entropy source
    pub fn new(mode: CipherMode, entropy: Arc<dyn EntropySource>) -> Self {
        Self { mode, entropy }
    }

    /// Create a cipher backed by the OS random generator
    pub fn with_mode(mode: CipherMode) -> Self {
        Self::new(mode, Arc::new(OsEntropy))
    }

    /// The mode this cipher is bound to
    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    /// Encrypt into the string form carried by a message
    pub fn seal(&self, plaintext: &[u8], key: &SharedSecret) -> Result<String> {
        match self.mode {
            CipherMode::Padded => encrypt_padded(plaintext, key, self.entropy.as_ref()),
            CipherMode::Stream => {
                let raw = encrypt_stream(plaintext, key, self.entropy.as_ref())?;
                Ok(STANDARD.encode(raw))
            }
        }
    }

    /// Decrypt the string form carried by a message
    pub fn open(&self, encrypted: &str, key: &SharedSecret) -> Result<Vec<u8>> {
        match self.mode {
            CipherMode::Padded => decrypt_padded(encrypted, key),
            CipherMode::Stream => {
                let raw = STANDARD
                    .decode(encrypted)
                    .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
                decrypt_stream(&raw, key)
            }
        }
    }
}

impl Default for PayloadCipher {
    fn default() -> Self {
        Self::with_mode(CipherMode::default())
    }
}

impl fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadCipher")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
