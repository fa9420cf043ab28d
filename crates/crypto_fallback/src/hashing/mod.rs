pub mod blake2b;
pub mod sha256;
pub mod sha512;

/// Streaming contract shared by the fixed-length block hashes.
///
/// The MAC and key-derivation layers are generic over this trait; the
/// associated constants expose the block geometry the HMAC key schedule
/// needs.
pub trait HashEngine: Clone {
    const BLOCK_LEN: usize;
    const OUT_LEN: usize;
    type Output: AsRef<[u8]> + Copy;

    fn new() -> Self;
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Self::Output;

    /// Reinitialize the engine for a fresh computation.
    fn reset(&mut self) {
        *self = Self::new();
    }
}
