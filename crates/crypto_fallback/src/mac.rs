use crate::hashing::blake2b::{Blake2b, Blake2bDigest, Blake2bError};
use crate::hashing::sha256::Sha256;
use crate::hashing::sha512::Sha512;
use crate::hashing::HashEngine;

// Largest block size among the engines; key schedules are sliced down to the
// engine's actual block length.
const MAX_BLOCK_LEN: usize = 128;

pub type HmacSha256 = Hmac<Sha256>;
pub type HmacSha512 = Hmac<Sha512>;

#[derive(Clone)]
pub struct Hmac<D: HashEngine> {
    inner: D,
    outer: D,
}

impl<D: HashEngine> Hmac<D> {
    pub fn new(key: &[u8]) -> Self {
        let mut key_block = [0u8; MAX_BLOCK_LEN];
        let key_block = &mut key_block[..D::BLOCK_LEN];
        if key.len() > D::BLOCK_LEN {
            let mut ctx = D::new();
            ctx.update(key);
            let hashed = ctx.finalize();
            key_block[..D::OUT_LEN].copy_from_slice(hashed.as_ref());
        } else {
            key_block[..key.len()].copy_from_slice(key);
        }

        let mut pad = [0u8; MAX_BLOCK_LEN];
        let pad = &mut pad[..D::BLOCK_LEN];

        let mut inner = D::new();
        for (p, byte) in pad.iter_mut().zip(key_block.iter()) {
            *p = byte ^ 0x36;
        }
        inner.update(pad);

        let mut outer = D::new();
        for (p, byte) in pad.iter_mut().zip(key_block.iter()) {
            *p = byte ^ 0x5c;
        }
        outer.update(pad);

        Self { inner, outer }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> D::Output {
        let inner_digest = self.inner.finalize();
        let mut outer = self.outer;
        outer.update(inner_digest.as_ref());
        outer.finalize()
    }
}

/// BLAKE2b presented through the MAC call shape. Backed by the native keyed
/// mode, not a second HMAC construction.
#[derive(Clone)]
pub struct Blake2bMac {
    ctx: Blake2b,
}

impl Blake2bMac {
    pub fn new(key: &[u8], digest_len: usize) -> Result<Self, Blake2bError> {
        Ok(Self {
            ctx: Blake2b::new_keyed(digest_len, key)?,
        })
    }

    pub fn update(&mut self, data: &[u8]) {
        self.ctx.update(data);
    }

    pub fn finalize(mut self) -> Blake2bDigest {
        self.ctx.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::blake2b;

    fn hmac_sha256(key: &[u8], data: &[u8]) -> String {
        let mut mac = HmacSha256::new(key);
        mac.update(data);
        hex::encode(mac.finalize())
    }

    fn hmac_sha512(key: &[u8], data: &[u8]) -> String {
        let mut mac = HmacSha512::new(key);
        mac.update(data);
        hex::encode(mac.finalize())
    }

    #[test]
    fn hmac_sha256_matches_rfc_4231() {
        assert_eq!(
            hmac_sha256(&[0x0b; 20], b"Hi There"),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
        assert_eq!(
            hmac_sha256(b"Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn hmac_sha512_matches_rfc_4231() {
        assert_eq!(
            hmac_sha512(&[0x0b; 20], b"Hi There"),
            "87aa7cdea5ef619d4ff0b4241a1d6cb02379f4e2ce4ec2787ad0b30545e17cde\
             daa833b7d6b8a702038b274eaea3f4e4be9d914eeb61f1702e696c203a126854"
        );
        assert_eq!(
            hmac_sha512(b"Jefe", b"what do ya want for nothing?"),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn oversized_keys_are_hashed_first() {
        let key = [0xaa; 131];
        let data = &b"Test Using Larger Than Block-Size Key - Hash Key First"[..];
        assert_eq!(
            hmac_sha256(&key, data),
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
        assert_eq!(
            hmac_sha512(&key, data),
            "80b24263c7c1a3ebb71493c1dd7be8b49b46d1f41b4aeec1121b013783f8f352\
             6b56d037e05f2598bd0fd2215d6a1e5295e64f73f63f0aec8b915a985d786598"
        );
    }

    #[test]
    fn blake2b_mac_forwards_to_keyed_mode() {
        let mut mac = Blake2bMac::new(b"secret", 32).unwrap();
        mac.update(b"the quick brown fox");
        let out = mac.finalize();
        assert_eq!(out, blake2b::mac(b"the quick brown fox", b"secret", 32).unwrap());
        assert!(matches!(
            Blake2bMac::new(&[0u8; 65], 32),
            Err(Blake2bError::BadKeyLength(65))
        ));
    }
}
