//! Security tests for relay request authentication
//!
//! Exercise replay protection under concurrency and across storage backends.

use std::sync::Arc;

use p2pchat_crypto::{KeyPair, OsEntropy};
use p2pchat_relay::{
    AuthError, AuthHeaders, MemoryNonceStore, NonceStore, RelayError, ReplayGuard, RequestParts,
    RequestSigner, SledNonceStore,
};

fn signer() -> RequestSigner {
    let pair = KeyPair::generate_random(&OsEntropy).unwrap();
    RequestSigner::new(pair.private_key().clone())
}

fn inbox_request(signer: &RequestSigner) -> (String, AuthHeaders) {
    let path = format!("/api/users/{}/messages", signer.public_key());
    let headers = signer.sign(&RequestParts::new("GET", &path, "", b"")).unwrap();
    (path, headers)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_replays_accept_exactly_once() {
    let guard = Arc::new(ReplayGuard::new(Arc::new(MemoryNonceStore::new())));
    let signer = signer();
    let (path, headers) = inbox_request(&signer);

    let mut tasks = Vec::new();
    for _ in 0..64 {
        let guard = guard.clone();
        let path = path.clone();
        let headers = headers.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            guard
                .authenticate(&headers, &RequestParts::new("GET", &path, "", b""))
                .map_err(|err| match err {
                    RelayError::Auth(auth) => auth,
                    other => panic!("unexpected error: {}", other),
                })
        }));
    }

    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert_eq!(err, AuthError::Replay),
        }
    }
    assert_eq!(accepted, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_identities_do_not_interfere() {
    let guard = Arc::new(ReplayGuard::new(Arc::new(MemoryNonceStore::new())));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let guard = guard.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let signer = signer();
            for _ in 0..10 {
                let (path, headers) = inbox_request(&signer);
                guard
                    .authenticate(&headers, &RequestParts::new("GET", &path, "", b""))
                    .unwrap();
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
}

#[test]
fn test_sled_guard_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = sled::open(dir.path()).unwrap();
    let signer = signer();
    let request = RequestParts::new("PUT", "/api/messages/abc/read", "", b"");
    let first = signer.sign_with_nonce(&request, 10).unwrap();

    {
        let guard = ReplayGuard::new(Arc::new(SledNonceStore::new(&db).unwrap()));
        guard.authenticate(&first, &request).unwrap();
    }

    let guard = ReplayGuard::new(Arc::new(SledNonceStore::new(&db).unwrap()));
    assert!(matches!(
        guard.authenticate(&first, &request),
        Err(RelayError::Auth(AuthError::Replay))
    ));

    let next = signer.sign_with_nonce(&request, 11).unwrap();
    guard.authenticate(&next, &request).unwrap();
    assert_eq!(guard.store().load(signer.public_key()).unwrap(), Some(11));
}

#[test_log::test]
fn test_captured_headers_cannot_be_reused_elsewhere() {
    let guard = ReplayGuard::new(Arc::new(MemoryNonceStore::new()));
    let signer = signer();

    let read = RequestParts::new("PUT", "/api/messages/abc/read", "", b"");
    let unread = RequestParts::new("PUT", "/api/messages/abc/unread", "", b"");
    let headers = signer.sign(&read).unwrap();

    // Same nonce, different route: fails on the signature, not the nonce
    assert!(matches!(
        guard.authenticate(&headers, &unread),
        Err(RelayError::Auth(AuthError::BadSignature))
    ));
    guard.authenticate(&headers, &read).unwrap();
}
