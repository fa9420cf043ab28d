use crate::hashing::HashEngine;
use crate::mac::Hmac;

// Largest digest among the engines; per-block accumulators are sliced down
// to the engine's output length.
const MAX_OUT_LEN: usize = 64;

/// PBKDF2 (RFC 8018) over any HMAC-capable hash engine.
///
/// Output of arbitrary length is produced by concatenating HMAC-sized
/// blocks and truncating the last one. `iterations` must be at least 1;
/// the scrypt stretch passes always use exactly 1.
pub fn derive<D: HashEngine>(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    out_len: usize,
) -> Vec<u8> {
    assert!(iterations >= 1, "iterations must be at least 1");

    let mut out = vec![0u8; out_len];
    let prototype = Hmac::<D>::new(password);

    for (index, chunk) in out.chunks_mut(D::OUT_LEN).enumerate() {
        let block_index = index as u32 + 1;

        let mut mac = prototype.clone();
        mac.update(salt);
        mac.update(&block_index.to_be_bytes());
        let mut u = mac.finalize();

        let mut t = [0u8; MAX_OUT_LEN];
        let t = &mut t[..D::OUT_LEN];
        t.copy_from_slice(u.as_ref());

        for _ in 1..iterations {
            let mut mac = prototype.clone();
            mac.update(u.as_ref());
            u = mac.finalize();
            for (acc, byte) in t.iter_mut().zip(u.as_ref().iter()) {
                *acc ^= byte;
            }
        }

        chunk.copy_from_slice(&t[..chunk.len()]);
    }

    out
}
