//! Cryptographic operations for objkeep
//!
//! Store keys are random 64-byte values. Record payloads are encrypted
//! with AES-256-CBC under the first 32 bytes of the store key, with a
//! random IV per payload and an MD5 checksum of the plaintext.

mod aes;
mod md5;
mod key;

pub use aes::{encrypt, decrypt};
pub use md5::md5_hex;
pub use key::{generate_key, cipher_key, KEY_LENGTH, AES_KEY_LENGTH};
