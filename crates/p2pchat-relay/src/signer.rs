//! Client-side request signing

use p2pchat_crypto::{PrivateKey, PublicKey};
use parking_lot::Mutex;

use crate::auth::{AuthHeaders, RequestParts};
use crate::error::Result;

/// Produces authentication headers for outgoing requests
///
/// Nonces start from the current time in nanoseconds and are bumped so that
/// every nonce from one signer is strictly greater than the previous one.
pub struct RequestSigner {
    private: PrivateKey,
    public: PublicKey,
    last_nonce: Mutex<u64>,
}

impl RequestSigner {
    /// Create a signer for `private`
    pub fn new(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self {
            private,
            public,
            last_nonce: Mutex::new(0),
        }
    }

    /// The identity requests are signed as
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Next nonce, never repeating
    pub fn next_nonce(&self) -> u64 {
        let now = chrono::Utc::now()
            .timestamp_nanos_opt()
            .and_then(|nanos| u64::try_from(nanos).ok())
            .unwrap_or_default();

        let mut last = self.last_nonce.lock();
        *last = now.max(last.saturating_add(1));
        *last
    }

    /// Sign a request with a fresh nonce
    pub fn sign(&self, request: &RequestParts<'_>) -> Result<AuthHeaders> {
        self.sign_with_nonce(request, self.next_nonce())
    }

    /// Sign a request with an explicit nonce
    pub fn sign_with_nonce(&self, request: &RequestParts<'_>, nonce: u64) -> Result<AuthHeaders> {
        let nonce = nonce.to_string();
        let signature = self.private.sign(&request.canonical(&nonce))?;
        Ok(AuthHeaders {
            public_key: Some(self.public.to_hex()),
            nonce: Some(nonce),
            signature: Some(signature.to_hex()),
        })
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
