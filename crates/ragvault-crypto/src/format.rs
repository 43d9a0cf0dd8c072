//! Encoding helpers for persisted key and ciphertext material.

use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Algorithm label reported by introspection.
pub const ALGORITHM: &str = "AES-256-GCM";

/// Key size in bytes (256 bits) for both KEK and DEKs.
pub const KEY_LEN: usize = 32;

/// GCM nonce size in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag size in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// Encode bytes as base64.
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode base64 string to bytes.
pub fn base64_decode(data: &str) -> CryptoResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| CryptoError::InvalidInput(format!("Invalid base64: {}", e)))
}

/// Decode a base64 nonce, requiring exactly [`NONCE_LEN`] bytes.
///
/// A garbled or truncated nonce is reported as a decryption failure, the
/// same as any other authentication problem.
pub fn decode_nonce(data: &str) -> CryptoResult<[u8; NONCE_LEN]> {
    let bytes = base64_decode(data).map_err(|_| CryptoError::Decryption)?;
    bytes.try_into().map_err(|_| CryptoError::Decryption)
}
