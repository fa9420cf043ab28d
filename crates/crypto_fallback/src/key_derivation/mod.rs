pub mod pbkdf2;
pub mod scrypt;

pub use scrypt::ScryptError;
