//! Master key (KEK) and organization data keys (DEKs).
//!
//! DEKs are wrapped under the KEK as `base64(nonce ‖ ciphertext ‖ tag)`
//! with no associated data. Both key types zeroize on drop and redact
//! themselves in `Debug` output.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::cipher::{aes_gcm_decrypt, aes_gcm_encrypt, generate_nonce, generate_random};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode, KEY_LEN, NONCE_LEN, TAG_LEN};

/// Process-wide key-encryption key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Create a master key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a base64-encoded master key.
    ///
    /// Anything other than valid base64 decoding to exactly 32 bytes is a
    /// configuration error.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let decoded = Zeroizing::new(base64_decode(encoded).map_err(|_| {
            CryptoError::Config("master key is not valid base64".to_string())
        })?);

        if decoded.len() != KEY_LEN {
            return Err(CryptoError::Config(format!(
                "master key must be {} bytes, got {}",
                KEY_LEN,
                decoded.len()
            )));
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&decoded);
        Ok(Self(key))
    }

    /// Generate a random master key.
    pub fn generate() -> Self {
        Self(generate_random())
    }

    /// Base64 encoding, for provisioning into a secret store.
    pub fn to_base64(&self) -> String {
        base64_encode(&self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MasterKey").field(&"[REDACTED]").finish()
    }
}

/// Per-organization data-encryption key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; KEY_LEN]);

impl DataKey {
    /// Generate a new random DEK.
    pub fn generate() -> Self {
        Self(generate_random())
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DataKey").field(&"[REDACTED]").finish()
    }
}

/// Generate a fresh base64-encoded master key for initial provisioning.
pub fn generate_master_key() -> String {
    MasterKey::generate().to_base64()
}

/// Wrap a DEK under the master key.
pub fn wrap_key(master_key: &MasterKey, dek: &DataKey) -> CryptoResult<String> {
    let nonce = generate_nonce();
    let ciphertext = aes_gcm_encrypt(master_key.as_bytes(), &nonce, dek.as_bytes(), &[])?;

    let mut wrapped = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    wrapped.extend_from_slice(&nonce);
    wrapped.extend_from_slice(&ciphertext);

    Ok(base64_encode(&wrapped))
}

/// Unwrap a DEK produced by [`wrap_key`].
///
/// Bad encoding, truncation, authentication failure and a wrong plaintext
/// length all surface as [`CryptoError::Unwrap`].
pub fn unwrap_key(master_key: &MasterKey, wrapped: &str) -> CryptoResult<DataKey> {
    let raw = base64_decode(wrapped).map_err(|_| CryptoError::Unwrap)?;
    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Unwrap);
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let nonce: &[u8; NONCE_LEN] = nonce.try_into().map_err(|_| CryptoError::Unwrap)?;

    let plaintext = Zeroizing::new(
        aes_gcm_decrypt(master_key.as_bytes(), nonce, ciphertext, &[])
            .map_err(|_| CryptoError::Unwrap)?,
    );

    if plaintext.len() != KEY_LEN {
        return Err(CryptoError::Unwrap);
    }

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&plaintext);
    Ok(DataKey(key))
}
