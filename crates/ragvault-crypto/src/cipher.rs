//! AES-256-GCM cipher operations.
//!
//! Content chunks are sealed under an organization DEK with a fresh random
//! nonce per call and bound to their identity through associated data.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::format::NONCE_LEN;
use crate::keys::DataKey;

/// Generate cryptographically secure random bytes.
pub fn generate_random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a random nonce (12 bytes).
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    generate_random()
}

/// Encrypt plaintext with AES-256-GCM, authenticating `aad`.
///
/// Returns ciphertext with appended authentication tag (16 bytes).
pub fn aes_gcm_encrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;

    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))
}

/// Decrypt ciphertext with AES-256-GCM, verifying `aad`.
///
/// The ciphertext must include the authentication tag (16 bytes) at the end.
pub fn aes_gcm_decrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Decryption)?;

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::Decryption)
}

/// Output of [`encrypt_content`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedContent {
    /// Ciphertext with the GCM tag as its final 16 bytes.
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub associated_data: String,
}

/// Encrypt a UTF-8 content chunk under an organization DEK.
///
/// `associated_data` is authenticated but not encrypted; decryption must
/// present the identical string.
pub fn encrypt_content(
    plaintext: &str,
    dek: &DataKey,
    associated_data: &str,
) -> CryptoResult<EncryptedContent> {
    let nonce = generate_nonce();
    let ciphertext = aes_gcm_encrypt(
        dek.as_bytes(),
        &nonce,
        plaintext.as_bytes(),
        associated_data.as_bytes(),
    )?;

    Ok(EncryptedContent {
        ciphertext,
        nonce,
        associated_data: associated_data.to_string(),
    })
}

/// Decrypt a content chunk produced by [`encrypt_content`].
///
/// Wrong key, wrong associated data, corrupted ciphertext and a malformed
/// nonce all yield the same [`CryptoError::Decryption`].
pub fn decrypt_content(
    ciphertext: &[u8],
    nonce: &[u8],
    associated_data: &str,
    dek: &DataKey,
) -> CryptoResult<String> {
    let nonce: &[u8; NONCE_LEN] = nonce.try_into().map_err(|_| CryptoError::Decryption)?;
    let plaintext = aes_gcm_decrypt(
        dek.as_bytes(),
        nonce,
        ciphertext,
        associated_data.as_bytes(),
    )?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption)
}
