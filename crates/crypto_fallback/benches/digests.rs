use blake2::Blake2b512;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crypto_fallback::hashing::{blake2b, sha256, sha512};
use crypto_fallback::key_derivation::scrypt;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sha2::Digest;

fn bench_digests(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1337);
    let mut payload = vec![0u8; 8192];
    rng.fill_bytes(&mut payload);

    c.bench_function("fallback::sha256", |b| {
        b.iter(|| {
            let digest = sha256::digest(black_box(&payload));
            black_box(digest);
        });
    });

    c.bench_function("sha2::sha256", |b| {
        b.iter(|| {
            let digest = sha2::Sha256::digest(black_box(&payload));
            black_box(digest);
        });
    });

    c.bench_function("fallback::sha512", |b| {
        b.iter(|| {
            let digest = sha512::digest(black_box(&payload));
            black_box(digest);
        });
    });

    c.bench_function("sha2::sha512", |b| {
        b.iter(|| {
            let digest = sha2::Sha512::digest(black_box(&payload));
            black_box(digest);
        });
    });

    c.bench_function("fallback::blake2b", |b| {
        b.iter(|| {
            let digest = blake2b::digest(black_box(&payload), 64).expect("digest");
            black_box(digest);
        });
    });

    c.bench_function("blake2::blake2b", |b| {
        b.iter(|| {
            let digest = Blake2b512::digest(black_box(&payload));
            black_box(digest);
        });
    });
}

fn bench_scrypt(c: &mut Criterion) {
    c.bench_function("fallback::scrypt", |b| {
        b.iter(|| {
            let key = scrypt::derive(black_box(b"password"), b"NaCl", 1024, 8, 1, 64)
                .expect("derive");
            black_box(key);
        });
    });
}

criterion_group!(benches, bench_digests, bench_scrypt);
criterion_main!(benches);
