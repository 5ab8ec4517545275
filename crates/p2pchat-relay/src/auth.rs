//! Replay-protected request authentication
//!
//! Every authenticated request carries the caller's public key, a nonce and
//! a Schnorr signature over the canonical request string. The relay keeps the
//! highest nonce accepted per key and refuses anything not strictly above it.

use std::sync::Arc;

use dashmap::DashMap;
use p2pchat_crypto::{PublicKey, Signature};
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::{AuthError, Result};
use crate::nonce::NonceStore;

/// Header carrying the caller's x-only public key (hex)
pub const PUBLIC_KEY_HEADER: &str = "Public-Key";

/// Header carrying the decimal request nonce
pub const NONCE_HEADER: &str = "Nonce";

/// Header carrying the request signature (hex)
pub const SIGNATURE_HEADER: &str = "Signature";

/// The bytes a request signature covers
///
/// `method ++ path ++ nonce ++ raw_query ++ raw_body`, with no separators.
/// `nonce` is the `Nonce` header value exactly as sent.
pub fn canonical_request(method: &str, path: &str, nonce: &str, query: &str, body: &[u8]) -> Vec<u8> {
    let mut canonical =
        Vec::with_capacity(method.len() + path.len() + nonce.len() + query.len() + body.len());
    canonical.extend_from_slice(method.as_bytes());
    canonical.extend_from_slice(path.as_bytes());
    canonical.extend_from_slice(nonce.as_bytes());
    canonical.extend_from_slice(query.as_bytes());
    canonical.extend_from_slice(body);
    canonical
}

/// The parts of an HTTP request that are signed
#[derive(Clone, Copy, Debug)]
pub struct RequestParts<'a> {
    /// HTTP method, e.g. `GET`
    pub method: &'a str,
    /// Request path without the query string
    pub path: &'a str,
    /// Raw query string without the leading `?`
    pub query: &'a str,
    /// Raw body bytes exactly as received
    pub body: &'a [u8],
}

impl<'a> RequestParts<'a> {
    /// Describe a request
    pub fn new(method: &'a str, path: &'a str, query: &'a str, body: &'a [u8]) -> Self {
        Self {
            method,
            path,
            query,
            body,
        }
    }

    /// Canonical bytes for this request under the raw `nonce` header
    pub fn canonical(&self, nonce: &str) -> Vec<u8> {
        canonical_request(self.method, self.path, nonce, self.query, self.body)
    }
}

/// Raw authentication header values
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthHeaders {
    /// `Public-Key` header
    pub public_key: Option<String>,
    /// `Nonce` header
    pub nonce: Option<String>,
    /// `Signature` header
    pub signature: Option<String>,
}

impl AuthHeaders {
    /// Collect the three headers through a lookup function
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        Self {
            public_key: lookup(PUBLIC_KEY_HEADER),
            nonce: lookup(NONCE_HEADER),
            signature: lookup(SIGNATURE_HEADER),
        }
    }

    /// Header name and value pairs for the headers that are present
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            (PUBLIC_KEY_HEADER, self.public_key.as_deref()),
            (NONCE_HEADER, self.nonce.as_deref()),
            (SIGNATURE_HEADER, self.signature.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// Parse a nonce header: plain ASCII digits that fit in a `u64`
pub fn parse_nonce(raw: &str) -> std::result::Result<u64, AuthError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthError::BadNonce);
    }
    raw.parse().map_err(|_| AuthError::BadNonce)
}

/// Authenticates requests and rejects replayed nonces
///
/// The check-then-store sequence for one identity runs under that identity's
/// own lock, so two requests with the same nonce can never both be accepted.
/// A lock lives in the map only while a request for its identity is in flight.
pub struct ReplayGuard {
    store: Arc<dyn NonceStore>,
    locks: DashMap<PublicKey, Arc<Mutex<()>>>,
}

impl ReplayGuard {
    /// Create a guard backed by `store`
    pub fn new(store: Arc<dyn NonceStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// The backing nonce store
    pub fn store(&self) -> &Arc<dyn NonceStore> {
        &self.store
    }

    fn lock_for(&self, key: &PublicKey) -> Arc<Mutex<()>> {
        self.locks.entry(*key).or_default().value().clone()
    }

    /// Drop the lock for `key` once no other request holds it
    fn release(&self, key: &PublicKey) {
        // Clones are only taken under the shard lock, so a count of one is stable here
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Authenticate a request, returning the caller's key
    ///
    /// The stored nonce only advances when every check has passed.
    #[instrument(skip(self, headers, request), fields(method = request.method, path = request.path))]
    pub fn authenticate(&self, headers: &AuthHeaders, request: &RequestParts<'_>) -> Result<PublicKey> {
        let key_hex = headers
            .public_key
            .as_deref()
            .ok_or(AuthError::Missing(PUBLIC_KEY_HEADER))?;
        let raw_nonce = headers.nonce.as_deref().ok_or(AuthError::BadNonce)?;
        let nonce = parse_nonce(raw_nonce)?;
        let sig_hex = headers
            .signature
            .as_deref()
            .ok_or(AuthError::Missing(SIGNATURE_HEADER))?;

        let key = PublicKey::from_hex(key_hex).map_err(|_| AuthError::BadSignature)?;

        let lock = self.lock_for(&key);
        let result = {
            let _held = lock.lock();
            self.check_and_store(&key, nonce, raw_nonce, sig_hex, request)
        };
        drop(lock);
        self.release(&key);
        result
    }

    /// Steps that must run under the identity's lock
    fn check_and_store(
        &self,
        key: &PublicKey,
        nonce: u64,
        raw_nonce: &str,
        sig_hex: &str,
        request: &RequestParts<'_>,
    ) -> Result<PublicKey> {
        let stored = self.store.load(key)?.unwrap_or(0);
        if nonce <= stored {
            debug!(key = %key, nonce, stored, "Replayed nonce");
            return Err(AuthError::Replay.into());
        }

        let signature = Signature::from_hex(sig_hex).map_err(|_| AuthError::BadSignature)?;
        if key.verify(&request.canonical(raw_nonce), &signature).is_err() {
            warn!(key = %key, "Request signature rejected");
            return Err(AuthError::BadSignature.into());
        }

        self.store.store(key, nonce)?;
        debug!(key = %key, nonce, "Request authenticated");
        Ok(*key)
    }
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("in_flight", &self.locks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::nonce::MemoryNonceStore;
    use p2pchat_crypto::{KeyPair, OsEntropy};

    const REQUEST: RequestParts<'static> =
        RequestParts { method: "GET", path: "/api/users/abc/messages", query: "limit=10", body: b"" };

    fn guard() -> ReplayGuard {
        ReplayGuard::new(Arc::new(MemoryNonceStore::new()))
    }

    fn pair() -> KeyPair {
        KeyPair::generate_random(&OsEntropy).unwrap()
    }

    fn signed(pair: &KeyPair, nonce: u64, request: &RequestParts<'_>) -> AuthHeaders {
        let signature = pair.private_key().sign(&request.canonical(&nonce.to_string())).unwrap();
        AuthHeaders {
            public_key: Some(pair.public_key().to_hex()),
            nonce: Some(nonce.to_string()),
            signature: Some(signature.to_hex()),
        }
    }

    fn auth_err(result: Result<PublicKey>) -> AuthError {
        match result {
            Err(RelayError::Auth(err)) => err,
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[test]
    fn test_canonical_request_layout() {
        assert_eq!(
            canonical_request("PUT", "/api/messages/x/read", "17", "a=1", b"{}"),
            b"PUT/api/messages/x/read17a=1{}".to_vec()
        );
        assert_eq!(canonical_request("GET", "/", "0", "", b""), b"GET/0".to_vec());
    }

    #[test]
    fn test_valid_request_accepted() {
        let guard = guard();
        let alice = pair();

        let key = guard.authenticate(&signed(&alice, 1, &REQUEST), &REQUEST).unwrap();
        assert_eq!(key, *alice.public_key());
        assert_eq!(guard.store().load(&key).unwrap(), Some(1));
    }

    #[test]
    fn test_replay_sequence() {
        let guard = guard();
        let alice = pair();

        guard.authenticate(&signed(&alice, 5, &REQUEST), &REQUEST).unwrap();

        for stale in [5, 3] {
            let err = auth_err(guard.authenticate(&signed(&alice, stale, &REQUEST), &REQUEST));
            assert_eq!(err, AuthError::Replay);
        }

        let fresh = signed(&alice, 6, &REQUEST);
        guard.authenticate(&fresh, &REQUEST).unwrap();
        assert_eq!(auth_err(guard.authenticate(&fresh, &REQUEST)), AuthError::Replay);
    }

    #[test]
    fn test_zero_nonce_never_accepted() {
        let guard = guard();
        let alice = pair();
        assert_eq!(
            auth_err(guard.authenticate(&signed(&alice, 0, &REQUEST), &REQUEST)),
            AuthError::Replay
        );
    }

    #[test]
    fn test_rejection_does_not_advance_nonce() {
        let guard = guard();
        let alice = pair();
        let mallory = pair();

        guard.authenticate(&signed(&alice, 6, &REQUEST), &REQUEST).unwrap();

        // Alice's key, someone else's signature
        let mut forged = signed(&mallory, 100, &REQUEST);
        forged.public_key = Some(alice.public_key().to_hex());
        assert_eq!(auth_err(guard.authenticate(&forged, &REQUEST)), AuthError::BadSignature);

        assert_eq!(guard.store().load(alice.public_key()).unwrap(), Some(6));
        guard.authenticate(&signed(&alice, 7, &REQUEST), &REQUEST).unwrap();
    }

    #[test]
    fn test_tampered_request_rejected() {
        let guard = guard();
        let alice = pair();
        let body_request = RequestParts::new("PUT", "/api/messages/x/read", "", b"{\"a\":1}");
        let headers = signed(&alice, 9, &body_request);

        let tampered = [
            RequestParts::new("POST", body_request.path, "", body_request.body),
            RequestParts::new("PUT", "/api/messages/y/read", "", body_request.body),
            RequestParts::new("PUT", body_request.path, "x=1", body_request.body),
            RequestParts::new("PUT", body_request.path, "", b"{\"a\":2}"),
        ];
        for request in &tampered {
            assert_eq!(auth_err(guard.authenticate(&headers, request)), AuthError::BadSignature);
        }

        guard.authenticate(&headers, &body_request).unwrap();
    }

    #[test]
    fn test_missing_headers() {
        let guard = guard();
        let alice = pair();
        let full = signed(&alice, 1, &REQUEST);

        let mut no_key = full.clone();
        no_key.public_key = None;
        assert_eq!(
            auth_err(guard.authenticate(&no_key, &REQUEST)),
            AuthError::Missing(PUBLIC_KEY_HEADER)
        );

        let mut no_nonce = full.clone();
        no_nonce.nonce = None;
        assert_eq!(auth_err(guard.authenticate(&no_nonce, &REQUEST)), AuthError::BadNonce);

        let mut no_sig = full;
        no_sig.signature = None;
        assert_eq!(
            auth_err(guard.authenticate(&no_sig, &REQUEST)),
            AuthError::Missing(SIGNATURE_HEADER)
        );
    }

    #[test]
    fn test_bad_nonce_forms() {
        for raw in ["", "abc", "-1", "+5", " 5", "5 ", "1.0", "18446744073709551616"] {
            assert_eq!(parse_nonce(raw), Err(AuthError::BadNonce), "accepted {:?}", raw);
        }
        assert_eq!(parse_nonce("007"), Ok(7));
        assert_eq!(parse_nonce("18446744073709551615"), Ok(u64::MAX));
    }

    #[test]
    fn test_malformed_key_or_signature() {
        let guard = guard();
        let alice = pair();

        let mut bad_key = signed(&alice, 1, &REQUEST);
        bad_key.public_key = Some("zz".to_string());
        assert_eq!(auth_err(guard.authenticate(&bad_key, &REQUEST)), AuthError::BadSignature);

        let mut bad_sig = signed(&alice, 1, &REQUEST);
        bad_sig.signature = Some("1234".to_string());
        assert_eq!(auth_err(guard.authenticate(&bad_sig, &REQUEST)), AuthError::BadSignature);
    }

    #[test]
    fn test_identities_are_independent() {
        let guard = guard();
        let alice = pair();
        let bob = pair();

        guard.authenticate(&signed(&alice, 50, &REQUEST), &REQUEST).unwrap();
        guard.authenticate(&signed(&bob, 1, &REQUEST), &REQUEST).unwrap();
        guard.authenticate(&signed(&bob, 2, &REQUEST), &REQUEST).unwrap();
    }

    #[test]
    fn test_concurrent_same_nonce_accepted_once() {
        let guard = guard();
        let alice = pair();
        let headers = signed(&alice, 42, &REQUEST);

        let accepted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| guard.authenticate(&headers, &REQUEST).is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(false))
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(accepted, 1);
    }

    #[test]
    fn test_nonce_signed_as_sent() {
        let guard = guard();
        let alice = pair();
        let request = RequestParts::new("GET", "/api/users/x/messages", "", b"");

        // Signed over the digits 7, sent as 007
        let mut padded = signed(&alice, 7, &request);
        padded.nonce = Some("007".to_string());
        assert_eq!(auth_err(guard.authenticate(&padded, &request)), AuthError::BadSignature);

        let signature = alice.private_key().sign(b"GET/api/users/x/messages007").unwrap();
        let headers = AuthHeaders {
            public_key: Some(alice.public_key().to_hex()),
            nonce: Some("007".to_string()),
            signature: Some(signature.to_hex()),
        };
        assert_eq!(guard.authenticate(&headers, &request).unwrap(), *alice.public_key());
        assert_eq!(guard.store().load(alice.public_key()).unwrap(), Some(7));
    }

    #[test]
    fn test_rejected_requests_leave_no_locks() {
        let guard = guard();
        let garbage = "00".repeat(64);

        for _ in 0..100 {
            let headers = AuthHeaders {
                public_key: Some(pair().public_key().to_hex()),
                nonce: Some("1".to_string()),
                signature: Some(garbage.clone()),
            };
            assert_eq!(auth_err(guard.authenticate(&headers, &REQUEST)), AuthError::BadSignature);
        }
        assert!(guard.locks.is_empty());

        let alice = pair();
        guard.authenticate(&signed(&alice, 1, &REQUEST), &REQUEST).unwrap();
        assert_eq!(auth_err(guard.authenticate(&signed(&alice, 1, &REQUEST), &REQUEST)), AuthError::Replay);
        assert!(guard.locks.is_empty());
    }

    #[test]
    fn test_auth_headers_lookup() {
        let headers = AuthHeaders::from_lookup(|name| match name {
            PUBLIC_KEY_HEADER => Some("ab".to_string()),
            NONCE_HEADER => Some("3".to_string()),
            _ => None,
        });
        assert_eq!(headers.signature, None);
        assert_eq!(headers.pairs(), vec![(PUBLIC_KEY_HEADER, "ab"), (NONCE_HEADER, "3")]);
    }
}
