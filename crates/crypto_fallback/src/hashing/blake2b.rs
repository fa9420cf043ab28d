use core::fmt;

use thiserror::Error;

pub const MAX_OUT_LEN: usize = 64;
pub const MAX_KEY_LEN: usize = 64;
const BLOCK_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Blake2bError {
    #[error("bad output length {0}: digest must be 1 to 64 bytes")]
    BadOutputLength(usize),
    #[error("bad key length {0}: key must be at most 64 bytes")]
    BadKeyLength(usize),
}

/// Keyed, variable-length BLAKE2b context.
///
/// Unlike the SHA-2 engines, a full buffered block is held back until more
/// input arrives: the last block of the stream must be compressed with the
/// final flag, and which block is last is only known at `finalize`.
#[derive(Clone)]
pub struct Blake2b {
    state: [u64; 8],
    buffer: [u8; BLOCK_LEN],
    buffer_len: usize,
    counter: u128,
    digest_len: usize,
    finalized: Option<Blake2bDigest>,
}

impl Blake2b {
    pub fn new(digest_len: usize) -> Result<Self, Blake2bError> {
        Self::new_keyed(digest_len, &[])
    }

    pub fn new_keyed(digest_len: usize, key: &[u8]) -> Result<Self, Blake2bError> {
        if digest_len == 0 || digest_len > MAX_OUT_LEN {
            return Err(Blake2bError::BadOutputLength(digest_len));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(Blake2bError::BadKeyLength(key.len()));
        }

        let mut state = IV;
        state[0] ^= 0x0101_0000 ^ ((key.len() as u64) << 8) ^ digest_len as u64;

        let mut ctx = Self {
            state,
            buffer: [0u8; BLOCK_LEN],
            buffer_len: 0,
            counter: 0,
            digest_len,
            finalized: None,
        };

        if !key.is_empty() {
            // The key occupies the whole first block even when shorter.
            ctx.buffer[..key.len()].copy_from_slice(key);
            ctx.buffer_len = BLOCK_LEN;
        }

        Ok(ctx)
    }

    pub fn digest_len(&self) -> usize {
        self.digest_len
    }

    /// Absorb input. Silently ignored once the context is finalized.
    pub fn update(&mut self, mut data: &[u8]) {
        if self.finalized.is_some() || data.is_empty() {
            return;
        }

        if self.buffer_len == BLOCK_LEN {
            // More input arrived, so the buffered block was not the last.
            self.counter += BLOCK_LEN as u128;
            let block = self.buffer;
            self.compress(&block, false);
            self.buffer_len = 0;
        }

        if self.buffer_len > 0 {
            let space = BLOCK_LEN - self.buffer_len;
            let take = space.min(data.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&data[..take]);
            self.buffer_len += take;
            data = &data[take..];
            if data.is_empty() {
                return;
            }
            self.counter += BLOCK_LEN as u128;
            let block = self.buffer;
            self.compress(&block, false);
            self.buffer_len = 0;
        }

        while data.len() > BLOCK_LEN {
            let mut block = [0u8; BLOCK_LEN];
            block.copy_from_slice(&data[..BLOCK_LEN]);
            self.counter += BLOCK_LEN as u128;
            self.compress(&block, false);
            data = &data[BLOCK_LEN..];
        }

        self.buffer[..data.len()].copy_from_slice(data);
        self.buffer_len = data.len();
    }

    /// Compress the remaining input with the final flag and return the
    /// digest. Further calls return the same digest.
    pub fn finalize(&mut self) -> Blake2bDigest {
        if let Some(digest) = self.finalized {
            return digest;
        }

        self.counter += self.buffer_len as u128;
        for byte in &mut self.buffer[self.buffer_len..] {
            *byte = 0;
        }
        let block = self.buffer;
        self.compress(&block, true);

        let mut bytes = [0u8; MAX_OUT_LEN];
        for (chunk, value) in bytes.chunks_mut(8).zip(self.state.iter()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        for byte in &mut bytes[self.digest_len..] {
            *byte = 0;
        }

        let digest = Blake2bDigest {
            bytes,
            len: self.digest_len,
        };
        self.finalized = Some(digest);
        digest
    }

    fn compress(&mut self, block: &[u8; BLOCK_LEN], last: bool) {
        let mut m = [0u64; 16];
        for (word, chunk) in m.iter_mut().zip(block.chunks_exact(8)) {
            *word = u64::from_le_bytes(chunk.try_into().expect("chunk"));
        }

        let mut v = [0u64; 16];
        v[..8].copy_from_slice(&self.state);
        v[8..].copy_from_slice(&IV);

        v[12] ^= self.counter as u64;
        v[13] ^= (self.counter >> 64) as u64;
        if last {
            v[14] = !v[14];
        }

        for sigma in &SIGMA {
            g(&mut v, 0, 4, 8, 12, m[sigma[0]], m[sigma[1]]);
            g(&mut v, 1, 5, 9, 13, m[sigma[2]], m[sigma[3]]);
            g(&mut v, 2, 6, 10, 14, m[sigma[4]], m[sigma[5]]);
            g(&mut v, 3, 7, 11, 15, m[sigma[6]], m[sigma[7]]);
            g(&mut v, 0, 5, 10, 15, m[sigma[8]], m[sigma[9]]);
            g(&mut v, 1, 6, 11, 12, m[sigma[10]], m[sigma[11]]);
            g(&mut v, 2, 7, 8, 13, m[sigma[12]], m[sigma[13]]);
            g(&mut v, 3, 4, 9, 14, m[sigma[14]], m[sigma[15]]);
        }

        for i in 0..8 {
            self.state[i] ^= v[i] ^ v[i + 8];
        }
    }
}

/// Variable-length digest, at most 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Blake2bDigest {
    bytes: [u8; MAX_OUT_LEN],
    len: usize,
}

impl Blake2bDigest {
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}

impl AsRef<[u8]> for Blake2bDigest {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Blake2bDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Blake2bDigest")
            .field(&hex::encode(self.as_slice()))
            .finish()
    }
}

pub fn digest(data: &[u8], digest_len: usize) -> Result<Blake2bDigest, Blake2bError> {
    let mut ctx = Blake2b::new(digest_len)?;
    ctx.update(data);
    Ok(ctx.finalize())
}

/// Hash the concatenation of two digest-sized nodes, as used for binary
/// Merkle trees. Both nodes must be exactly `digest_len` bytes.
pub fn root(left: &[u8], right: &[u8], digest_len: usize) -> Result<Blake2bDigest, Blake2bError> {
    assert_eq!(left.len(), digest_len, "left node length");
    assert_eq!(right.len(), digest_len, "right node length");
    let mut ctx = Blake2b::new(digest_len)?;
    ctx.update(left);
    ctx.update(right);
    Ok(ctx.finalize())
}

pub fn mac(data: &[u8], key: &[u8], digest_len: usize) -> Result<Blake2bDigest, Blake2bError> {
    let mut ctx = Blake2b::new_keyed(digest_len, key)?;
    ctx.update(data);
    Ok(ctx.finalize())
}

#[inline(always)]
fn g(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

const IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

const SIGMA: [[usize; 16]; 12] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_published_vectors() {
        let cases: &[(&[u8], usize, &str)] = &[
            (
                &b""[..],
                64,
                "786a02f742015903c6c6fd852552d272912f4740e15847618a86e217f71f5419\
                 d25e1031afee585313896444934eb04b903a685b1448b755d56f701afe9be2ce",
            ),
            (
                &b"abc"[..],
                64,
                "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
                 7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923",
            ),
            (
                &b""[..],
                32,
                "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8",
            ),
            (
                &b"abc"[..],
                32,
                "bddd813c634239723171ef3fee98579b94964e3bb1cb3e427262c8c068d52319",
            ),
        ];
        for &(input, size, expected) in cases {
            let out = digest(input, size).unwrap();
            assert_eq!(hex::encode(out.as_slice()), expected);
        }
    }

    #[test]
    fn exact_block_multiple_compresses_once() {
        // 128 bytes must be hashed as a single final block, not followed by
        // an extra zero block.
        let out = digest(&[b'a'; 128], 64).unwrap();
        assert_eq!(
            hex::encode(out.as_slice()),
            "fc6c71f688f43ea7d60817478808f3cac753e61571865c95adbc2d9122c943a7\
             6b92c2cb1047ef3fe7bf6e436ec1d0a99a9e5b216780bf7fed9d7ca91d3a8f3b"
        );
        let out = digest(&[b'a'; 256], 32).unwrap();
        assert_eq!(
            hex::encode(out.as_slice()),
            "eae4d3a7627549b383179dc18049964f91a6fed14c9f3fb26705eda3eeda5558"
        );
    }

    #[test]
    fn keyed_digest_matches_reference_kat() {
        let key: Vec<u8> = (0u8..64).collect();
        let mut ctx = Blake2b::new_keyed(64, &key).unwrap();
        ctx.update(b"");
        assert_eq!(
            hex::encode(ctx.finalize().as_slice()),
            "10ebb67700b1868efb4417987acf4690ae9d972fb7a590c2f02871799aaa4786\
             b5e996e8f0f4eb981fc214b005f42d2ff4233499391653df7aefcbc13fc51568"
        );

        let mut ctx = Blake2b::new_keyed(64, &key).unwrap();
        ctx.update(&[0u8]);
        assert_eq!(
            hex::encode(ctx.finalize().as_slice()),
            "961f6dd1e4dd30f63901690c512e78e4b45e4742ed197c3c5e45c549fd25f2e4\
             187b0bc9fe30492b16b0d0bc4ef9b0f34c7003fac09a5ef1532e69430234cebd"
        );
    }

    #[test]
    fn every_digest_length_is_honored() {
        for size in 1..=MAX_OUT_LEN {
            let out = digest(b"length probe", size).unwrap();
            assert_eq!(out.len(), size);
            assert_eq!(out.as_slice().len(), size);
        }
        assert_eq!(hex::encode(digest(b"abc", 1).unwrap().as_slice()), "6b");
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            Blake2b::new(0),
            Err(Blake2bError::BadOutputLength(0))
        ));
        assert!(matches!(
            Blake2b::new(65),
            Err(Blake2bError::BadOutputLength(65))
        ));
        assert!(matches!(
            Blake2b::new_keyed(32, &[0u8; 65]),
            Err(Blake2bError::BadKeyLength(65))
        ));
    }

    #[test]
    fn update_after_finalize_is_ignored() {
        let mut ctx = Blake2b::new(32).unwrap();
        ctx.update(b"abc");
        let first = ctx.finalize();
        ctx.update(b"more data");
        assert_eq!(ctx.finalize(), first);
    }

    #[test]
    fn digest_is_chunking_invariant() {
        let data = [0x42u8; 200];
        let mut ctx = Blake2b::new(64).unwrap();
        ctx.update(&data[..128]);
        ctx.update(&data[128..129]);
        ctx.update(&data[129..]);
        let expected = digest(&data, 64).unwrap();
        assert_eq!(ctx.finalize(), expected);
        assert_eq!(
            hex::encode(expected.as_slice()),
            "70b74ffdd6884651da50743d20c4ec9df6040ceb3e98ddd4cb786db7a08c6913\
             edb1c2bd381411092052722464fef2f9469e865423bd08b736d32490da2b7e8f"
        );
    }

    #[test]
    fn root_hashes_concatenated_pair() {
        let left = [0x11u8; 32];
        let right = [0x22u8; 32];
        let out = root(&left, &right, 32).unwrap();
        assert_eq!(
            hex::encode(out.as_slice()),
            "428d37d6b34f605a8ff32b6a04c95d9c7d2aead9ecde193b2f5019b7f13ced23"
        );
        let mut concat = Vec::new();
        concat.extend_from_slice(&left);
        concat.extend_from_slice(&right);
        assert_eq!(out, digest(&concat, 32).unwrap());
    }

    #[test]
    fn mac_matches_keyed_digest() {
        let out = mac(b"the quick brown fox", b"secret", 32).unwrap();
        assert_eq!(
            hex::encode(out.as_slice()),
            "946938230fff124e0d2f8f177f2ea348298d0304d3741284b2244b1efa8e9e85"
        );
    }
}
