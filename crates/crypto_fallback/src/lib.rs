#![forbid(unsafe_code)]

pub mod hashing;
pub mod key_derivation;
pub mod mac;
#[cfg(feature = "telemetry")]
pub mod telemetry;

/// Semantic version of the fallback crate for telemetry labeling.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use hashing::blake2b::{Blake2b, Blake2bDigest, Blake2bError};
pub use hashing::sha256::Sha256;
pub use hashing::sha512::Sha512;
pub use hashing::HashEngine;
pub use key_derivation::scrypt::ScryptError;
pub use mac::{Blake2bMac, Hmac, HmacSha256, HmacSha512};
