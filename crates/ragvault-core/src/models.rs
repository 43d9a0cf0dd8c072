//! Domain models shared between the key hierarchy and its storage backends.

use serde::{Deserialize, Serialize};

use crate::defaults::INITIAL_KEY_VERSION;

/// Persisted form of an organization's data encryption key.
///
/// `wrapped_dek` is the base64 encoding of `nonce ‖ ciphertext ‖ tag`
/// produced by sealing the DEK under the master key. The plaintext DEK is
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WrappedDekRecord {
    /// Version of this DEK for the organization.
    pub key_version: i32,
    /// Opaque wrapped key material.
    pub wrapped_dek: String,
}

impl WrappedDekRecord {
    /// Record for a freshly provisioned DEK.
    pub fn initial(wrapped_dek: String) -> Self {
        Self {
            key_version: INITIAL_KEY_VERSION,
            wrapped_dek,
        }
    }
}

/// One encrypted content chunk as persisted by callers.
///
/// All fields must be stored together: losing the nonce or associated data
/// makes the chunk unrecoverable, losing the hash makes it unverifiable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EncryptedChunk {
    pub organization_id: String,
    pub document_id: String,
    pub chunk_index: i32,
    /// DEK version the chunk was sealed under.
    pub key_version: i32,
    /// Base64 ciphertext with the 16-byte GCM tag appended.
    pub ciphertext: String,
    /// Base64 96-bit nonce.
    pub nonce: String,
    /// Rendered associated data the ciphertext is bound to.
    pub associated_data: String,
    /// Hex SHA-256 of the plaintext.
    pub content_hash: String,
}
