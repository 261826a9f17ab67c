//! Cryptographic utilities for token generation, hashing and URL signing.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Error type for signing operations.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Signing key must not be empty")]
    EmptyKey,
}

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a URL-safe random token with the given prefix.
///
/// `random_bytes` bytes are drawn from the operating system CSPRNG, so the
/// entropy of the result is `8 * random_bytes` bits.
pub fn generate_secure_token(prefix: &str, random_bytes: usize) -> String {
    let mut bytes = vec![0u8; random_bytes];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{}{}", prefix, URL_SAFE_NO_PAD.encode(&bytes))
}

/// Signs `message` with HMAC-SHA256 and returns the hex-encoded tag.
pub fn hmac_sha256_hex(key: &[u8], message: &str) -> Result<String, SigningError> {
    if key.is_empty() {
        return Err(SigningError::EmptyKey);
    }
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SigningError::EmptyKey)?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compares two strings without short-circuiting on the first mismatch.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
