//! Store encryption keys
//!
//! Each logical store has its own random key, generated once and kept in
//! a [`KeyStore`](crate::factory::KeyStore). The first 32 bytes are the
//! AES-256 key; the remainder is reserved so keys keep the fixed length
//! the key stores expect.

use rand::Rng;

/// Length of a store encryption key in bytes
pub const KEY_LENGTH: usize = 64;

/// Length of the AES-256 key taken from the front of a store key
pub const AES_KEY_LENGTH: usize = 32;

/// Generate a new store key from the thread-local CSPRNG
pub fn generate_key() -> Vec<u8> {
    let mut key = vec![0u8; KEY_LENGTH];
    rand::rng().fill(&mut key[..]);
    key
}

/// Extract the AES-256 key from a store key
///
/// Returns `None` when the store key is too short.
pub fn cipher_key(store_key: &[u8]) -> Option<[u8; AES_KEY_LENGTH]> {
    store_key.get(..AES_KEY_LENGTH)?.try_into().ok()
}
