//! Memory-hard key derivation (RFC 7914).
//!
//! `derive` stretches the password with one PBKDF2-HMAC-SHA256 pass, runs
//! the ROMix schedule over each of the `p` independent `128 * r`-byte blocks
//! against an `N`-entry scratch table, and finishes with a second PBKDF2
//! pass over the mixed blocks. The cost parameters are attacker and caller
//! controlled; `N` and `r` bound the scratch table at `128 * r * N` bytes.

use thiserror::Error;
use tracing::debug;

use crate::hashing::sha256::Sha256;
use crate::key_derivation::pbkdf2;

const CHUNK_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScryptError {
    /// `r * p` reached 2^30, or the requested buffers exceed addressable
    /// memory.
    #[error("block size and parallelism are too large")]
    TooLarge,
    /// `N` is not a power of two between 2 and 2^32 - 1.
    #[error("invalid cost parameter {0}")]
    InvalidCost(u64),
    /// `r` or `p` is zero.
    #[error("block size and parallelism must be nonzero")]
    ZeroParameter,
}

pub fn derive(
    password: &[u8],
    salt: &[u8],
    n: u64,
    r: u32,
    p: u32,
    out_len: usize,
) -> Result<Vec<u8>, ScryptError> {
    let out = derive_inner(password, salt, n, r, p, out_len);
    #[cfg(feature = "telemetry")]
    crate::telemetry::record("scrypt", "derive", out.is_ok());
    out
}

/// Cooperative variant of [`derive`]: byte-identical output, but control is
/// yielded back to the scheduler between ROMix iterations so a long
/// derivation does not monopolize the runtime. There is no cancellation
/// point beyond dropping the future at a yield.
#[cfg(feature = "async")]
pub async fn derive_async(
    password: &[u8],
    salt: &[u8],
    n: u64,
    r: u32,
    p: u32,
    out_len: usize,
) -> Result<Vec<u8>, ScryptError> {
    let out = derive_async_inner(password, salt, n, r, p, out_len).await;
    #[cfg(feature = "telemetry")]
    crate::telemetry::record("scrypt", "derive_async", out.is_ok());
    out
}

fn derive_inner(
    password: &[u8],
    salt: &[u8],
    n: u64,
    r: u32,
    p: u32,
    out_len: usize,
) -> Result<Vec<u8>, ScryptError> {
    let (block_len, scratch_len, stretched_len) = layout(n, r, p)?;
    debug!(n, r, p, out_len, "deriving scrypt key");

    let mut stretched = pbkdf2::derive::<Sha256>(password, salt, 1, stretched_len);
    let mut scratch = vec![0u8; scratch_len];
    let mut work = vec![0u8; 2 * block_len];

    for block in stretched.chunks_mut(block_len) {
        smix(block, n as usize, &mut scratch, &mut work);
    }

    Ok(pbkdf2::derive::<Sha256>(password, &stretched, 1, out_len))
}

#[cfg(feature = "async")]
async fn derive_async_inner(
    password: &[u8],
    salt: &[u8],
    n: u64,
    r: u32,
    p: u32,
    out_len: usize,
) -> Result<Vec<u8>, ScryptError> {
    let (block_len, scratch_len, stretched_len) = layout(n, r, p)?;
    debug!(n, r, p, out_len, "deriving scrypt key cooperatively");

    let mut stretched = pbkdf2::derive::<Sha256>(password, salt, 1, stretched_len);
    let mut scratch = vec![0u8; scratch_len];
    let mut work = vec![0u8; 2 * block_len];

    for block in stretched.chunks_mut(block_len) {
        smix_async(block, n as usize, &mut scratch, &mut work).await;
    }

    Ok(pbkdf2::derive::<Sha256>(password, &stretched, 1, out_len))
}

/// Validate the cost parameters and size the working buffers. Nothing is
/// allocated and no key material is touched until this succeeds.
fn layout(n: u64, r: u32, p: u32) -> Result<(usize, usize, usize), ScryptError> {
    if r == 0 || p == 0 {
        return Err(ScryptError::ZeroParameter);
    }
    if (r as u64) * (p as u64) >= 1 << 30 {
        return Err(ScryptError::TooLarge);
    }
    if n < 2 || !n.is_power_of_two() || n > u32::MAX as u64 {
        return Err(ScryptError::InvalidCost(n));
    }

    let block_len = (r as usize).checked_mul(128).ok_or(ScryptError::TooLarge)?;
    let scratch_len = block_len
        .checked_mul(n as usize)
        .ok_or(ScryptError::TooLarge)?;
    let stretched_len = block_len
        .checked_mul(p as usize)
        .ok_or(ScryptError::TooLarge)?;

    Ok((block_len, scratch_len, stretched_len))
}

/// ROMix: fill the scratch table with the chain of mixed states, then fold
/// `n` pseudo-randomly selected entries back into the block.
fn smix(block: &mut [u8], n: usize, scratch: &mut [u8], work: &mut [u8]) {
    let block_len = block.len();
    let (x, y) = work.split_at_mut(block_len);
    x.copy_from_slice(block);

    for slot in scratch.chunks_mut(block_len) {
        slot.copy_from_slice(x);
        block_mix(x, y);
    }

    for _ in 0..n {
        let j = integerify(x) & (n - 1);
        xor_into(x, &scratch[j * block_len..(j + 1) * block_len]);
        block_mix(x, y);
    }

    block.copy_from_slice(x);
}

#[cfg(feature = "async")]
async fn smix_async(block: &mut [u8], n: usize, scratch: &mut [u8], work: &mut [u8]) {
    let block_len = block.len();
    let (x, y) = work.split_at_mut(block_len);
    x.copy_from_slice(block);

    for slot in scratch.chunks_mut(block_len) {
        slot.copy_from_slice(x);
        block_mix(x, y);
        tokio::task::yield_now().await;
    }

    for _ in 0..n {
        let j = integerify(x) & (n - 1);
        xor_into(x, &scratch[j * block_len..(j + 1) * block_len]);
        block_mix(x, y);
        tokio::task::yield_now().await;
    }

    block.copy_from_slice(x);
}

/// One BlockMix pass: run the Salsa20/8 chain over the `2r` chunks of `x`
/// into `y`, then de-interleave (even-indexed mixed chunks into the first
/// half of `x`, odd-indexed into the second).
fn block_mix(x: &mut [u8], y: &mut [u8]) {
    let mut t = [0u8; CHUNK_LEN];
    t.copy_from_slice(&x[x.len() - CHUNK_LEN..]);

    for (i, chunk) in x.chunks(CHUNK_LEN).enumerate() {
        for (acc, byte) in t.iter_mut().zip(chunk) {
            *acc ^= byte;
        }
        salsa20_8(&mut t);
        y[i * CHUNK_LEN..(i + 1) * CHUNK_LEN].copy_from_slice(&t);
    }

    let half = x.len() / 2;
    let r = x.len() / (2 * CHUNK_LEN);
    for i in 0..r {
        x[i * CHUNK_LEN..(i + 1) * CHUNK_LEN]
            .copy_from_slice(&y[2 * i * CHUNK_LEN..(2 * i + 1) * CHUNK_LEN]);
    }
    for i in 0..r {
        x[half + i * CHUNK_LEN..half + (i + 1) * CHUNK_LEN]
            .copy_from_slice(&y[(2 * i + 1) * CHUNK_LEN..(2 * i + 2) * CHUNK_LEN]);
    }
}

// Low 32 bits of the block's last 64-byte chunk, little-endian. The caller
// masks with n - 1, which relies on n being a power of two.
fn integerify(x: &[u8]) -> usize {
    let offset = x.len() - CHUNK_LEN;
    u32::from_le_bytes(x[offset..offset + 4].try_into().expect("chunk")) as usize
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

fn salsa20_8(block: &mut [u8; CHUNK_LEN]) {
    let mut input = [0u32; 16];
    for (word, chunk) in input.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_le_bytes(chunk.try_into().expect("chunk"));
    }

    let mut x = input;
    for _ in 0..4 {
        // Column round.
        x[4] ^= x[0].wrapping_add(x[12]).rotate_left(7);
        x[8] ^= x[4].wrapping_add(x[0]).rotate_left(9);
        x[12] ^= x[8].wrapping_add(x[4]).rotate_left(13);
        x[0] ^= x[12].wrapping_add(x[8]).rotate_left(18);

        x[9] ^= x[5].wrapping_add(x[1]).rotate_left(7);
        x[13] ^= x[9].wrapping_add(x[5]).rotate_left(9);
        x[1] ^= x[13].wrapping_add(x[9]).rotate_left(13);
        x[5] ^= x[1].wrapping_add(x[13]).rotate_left(18);

        x[14] ^= x[10].wrapping_add(x[6]).rotate_left(7);
        x[2] ^= x[14].wrapping_add(x[10]).rotate_left(9);
        x[6] ^= x[2].wrapping_add(x[14]).rotate_left(13);
        x[10] ^= x[6].wrapping_add(x[2]).rotate_left(18);

        x[3] ^= x[15].wrapping_add(x[11]).rotate_left(7);
        x[7] ^= x[3].wrapping_add(x[15]).rotate_left(9);
        x[11] ^= x[7].wrapping_add(x[3]).rotate_left(13);
        x[15] ^= x[11].wrapping_add(x[7]).rotate_left(18);

        // Row round.
        x[1] ^= x[0].wrapping_add(x[3]).rotate_left(7);
        x[2] ^= x[1].wrapping_add(x[0]).rotate_left(9);
        x[3] ^= x[2].wrapping_add(x[1]).rotate_left(13);
        x[0] ^= x[3].wrapping_add(x[2]).rotate_left(18);

        x[6] ^= x[5].wrapping_add(x[4]).rotate_left(7);
        x[7] ^= x[6].wrapping_add(x[5]).rotate_left(9);
        x[4] ^= x[7].wrapping_add(x[6]).rotate_left(13);
        x[5] ^= x[4].wrapping_add(x[7]).rotate_left(18);

        x[11] ^= x[10].wrapping_add(x[9]).rotate_left(7);
        x[8] ^= x[11].wrapping_add(x[10]).rotate_left(9);
        x[9] ^= x[8].wrapping_add(x[11]).rotate_left(13);
        x[10] ^= x[9].wrapping_add(x[8]).rotate_left(18);

        x[12] ^= x[15].wrapping_add(x[14]).rotate_left(7);
        x[13] ^= x[12].wrapping_add(x[15]).rotate_left(9);
        x[14] ^= x[13].wrapping_add(x[12]).rotate_left(13);
        x[15] ^= x[14].wrapping_add(x[13]).rotate_left(18);
    }

    for (word, orig) in x.iter_mut().zip(input.iter()) {
        *word = word.wrapping_add(*orig);
    }
    for (chunk, word) in block.chunks_exact_mut(4).zip(x.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}
