//! MD5 digests for payload checksums and row identity
//!
//! Every encrypted payload carries the MD5 of its plaintext so that a
//! wrong key is detected on decryption. Records without a primary key
//! are identified by the MD5 of their canonical JSON.

use md5::{Md5, Digest};

/// Calculate MD5 of the input and return it as a lowercase hex string (32 chars)
///
/// # Example
///
/// ```
/// use objkeep::crypto::md5_hex;
///
/// assert_eq!(md5_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
/// ```
pub fn md5_hex(input: impl AsRef<[u8]>) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_ref());
    let result = hasher.finalize();

    result.iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
