//! Benchmarks for P2PChat cryptographic operations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use p2pchat_crypto::{
    cipher::{decrypt_padded, encrypt_padded, encrypt_stream},
    keys::{derive_private_key, mnemonic_from_words, seed_from_mnemonic},
    CipherMode, KeyPair, OsEntropy, PayloadCipher, SharedSecret,
};

const WORDS: &str = "abandon abandon abandon abandon abandon abandon \
    abandon abandon abandon abandon abandon abandon \
    abandon abandon abandon abandon abandon abandon \
    abandon abandon abandon abandon abandon art";

fn bench_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Key Generation");
    let mnemonic = mnemonic_from_words(WORDS).unwrap();

    group.bench_function("random_keypair", |b| {
        b.iter(|| black_box(KeyPair::generate_random(&OsEntropy).unwrap()))
    });

    group.bench_function("mnemonic_seed", |b| {
        b.iter(|| black_box(seed_from_mnemonic(&mnemonic, "")))
    });

    let seed = seed_from_mnemonic(&mnemonic, "");
    group.bench_function("bip32_derive", |b| {
        b.iter(|| black_box(derive_private_key(&seed[..]).unwrap()))
    });

    group.finish();
}

fn bench_shared_secret(c: &mut Criterion) {
    let alice = KeyPair::generate_random(&OsEntropy).unwrap();
    let bob = KeyPair::generate_random(&OsEntropy).unwrap();

    c.bench_function("secp256k1_ecdh", |b| {
        b.iter(|| black_box(SharedSecret::derive(alice.private_key(), bob.public_key()).unwrap()))
    });
}

fn bench_signatures(c: &mut Criterion) {
    let mut group = c.benchmark_group("Schnorr");
    let pair = KeyPair::generate_random(&OsEntropy).unwrap();
    let message = b"Hello, what is happening.";
    let signature = pair.private_key().sign(message).unwrap();

    group.bench_function("sign", |b| {
        b.iter(|| black_box(pair.private_key().sign(message).unwrap()))
    });

    group.bench_function("verify", |b| {
        b.iter(|| black_box(pair.public_key().verify(message, &signature).is_ok()))
    });

    group.finish();
}

fn bench_payload_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("Payload Cipher");
    let key = SharedSecret::from_bytes([0x42; 32]);

    for size in [64, 256, 1024, 4096, 16384].iter() {
        let plaintext = vec![0x42u8; *size];

        group.bench_with_input(BenchmarkId::new("padded_encrypt", size), size, |b, _| {
            b.iter(|| black_box(encrypt_padded(&plaintext, &key, &OsEntropy).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("stream_encrypt", size), size, |b, _| {
            b.iter(|| black_box(encrypt_stream(&plaintext, &key, &OsEntropy).unwrap()))
        });
    }

    let plaintext = vec![0x42u8; 1024];
    let encoded = encrypt_padded(&plaintext, &key, &OsEntropy).unwrap();
    group.bench_function("padded_decrypt_1kb", |b| {
        b.iter(|| black_box(decrypt_padded(&encoded, &key).unwrap()))
    });

    let stream = PayloadCipher::with_mode(CipherMode::Stream);
    let sealed = stream.seal(&plaintext, &key).unwrap();
    group.bench_function("stream_open_1kb", |b| {
        b.iter(|| black_box(stream.open(&sealed, &key).unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_key_generation,
    bench_shared_secret,
    bench_signatures,
    bench_payload_cipher,
);
criterion_main!(benches);
