//! AES-256-CBC payload encryption
//!
//! Layout of an encrypted payload:
//! - 16 random IV bytes
//! - AES-256-CBC (PKCS7) of `md5_hex(plaintext) || plaintext`
//!
//! The MD5 prefix lets decryption detect a wrong key instead of handing
//! back garbage.

use aes::Aes256;
use cbc::{Encryptor, Decryptor};
use cbc::cipher::{BlockModeEncrypt, BlockModeDecrypt, KeyIvInit};
use block_padding::Pkcs7;
use rand::Rng;

use super::key::{cipher_key, AES_KEY_LENGTH};
use super::md5::md5_hex;

/// IV size for AES-CBC (16 bytes = 128 bits)
const IV_SIZE: usize = 16;

/// AES block size
const BLOCK_SIZE: usize = 16;

/// MD5 hex string length
const MD5_HEX_LENGTH: usize = 32;

type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

/// Encrypt a payload with a store key
///
/// # Arguments
///
/// * `plaintext` - The bytes to encrypt
/// * `store_key` - The store key (at least 32 bytes)
///
/// # Returns
///
/// IV-prefixed ciphertext on success, or error message on failure
pub fn encrypt(plaintext: &[u8], store_key: &[u8]) -> Result<Vec<u8>, String> {
    let key = cipher_key(store_key)
        .ok_or_else(|| format!("Store key shorter than {} bytes", AES_KEY_LENGTH))?;

    let mut iv = [0u8; IV_SIZE];
    rand::rng().fill(&mut iv[..]);

    let checksum = md5_hex(plaintext);
    let mut data = Vec::with_capacity(MD5_HEX_LENGTH + plaintext.len());
    data.extend_from_slice(checksum.as_bytes());
    data.extend_from_slice(plaintext);

    // Room for at least one padding byte
    let padded_len = ((data.len() / BLOCK_SIZE) + 1) * BLOCK_SIZE;
    let mut buffer = vec![0u8; padded_len];
    buffer[..data.len()].copy_from_slice(&data);

    let encryptor = Aes256CbcEnc::new(&key.into(), &iv.into());

    let encrypted = encryptor
        .encrypt_padded::<Pkcs7>(&mut buffer, data.len())
        .map_err(|e| format!("Encryption failed: {:?}", e))?;

    let mut output = Vec::with_capacity(IV_SIZE + encrypted.len());
    output.extend_from_slice(&iv);
    output.extend_from_slice(encrypted);
    Ok(output)
}

/// Decrypt a payload produced by [`encrypt`]
///
/// Fails when the key is wrong, the payload is truncated or the checksum
/// does not match.
pub fn decrypt(ciphertext: &[u8], store_key: &[u8]) -> Result<Vec<u8>, String> {
    let key = cipher_key(store_key)
        .ok_or_else(|| format!("Store key shorter than {} bytes", AES_KEY_LENGTH))?;

    if ciphertext.len() <= IV_SIZE {
        return Err("Ciphertext too short".to_string());
    }

    let (iv_bytes, body) = ciphertext.split_at(IV_SIZE);
    let iv: [u8; IV_SIZE] = iv_bytes
        .try_into()
        .map_err(|_| "Invalid IV".to_string())?;

    let mut buffer = body.to_vec();
    let decryptor = Aes256CbcDec::new(&key.into(), &iv.into());

    let decrypted = decryptor
        .decrypt_padded::<Pkcs7>(&mut buffer)
        .map_err(|e| format!("Decryption failed: {:?}", e))?;

    if decrypted.len() < MD5_HEX_LENGTH {
        return Err("Decrypted payload too short".to_string());
    }

    let (checksum, plaintext) = decrypted.split_at(MD5_HEX_LENGTH);
    if checksum != md5_hex(plaintext).as_bytes() {
        return Err("MD5 checksum mismatch".to_string());
    }

    Ok(plaintext.to_vec())
}
