//! Chunk sealing: turns content plus an organization's DEK into the record
//! callers persist.
//!
//! Associated data binds each chunk to `organization|document|index|vN`.
//! Decryption recomputes it from the identity the caller claims, so a chunk
//! presented under another tenant, document, position or key version fails
//! authentication even with the right key.

use std::fmt;
use std::sync::Arc;

use ragvault_core::defaults::AAD_SEPARATOR;
use ragvault_core::EncryptedChunk;
use tracing::{error, trace};

use crate::cipher::{decrypt_content, encrypt_content};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode, decode_nonce};
use crate::integrity::{hash_content, validate_integrity};
use crate::keyring::KeyManager;

/// Identity a content chunk is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociatedData<'a> {
    organization_id: &'a str,
    document_id: &'a str,
    chunk_index: i32,
    key_version: i32,
}

impl<'a> AssociatedData<'a> {
    /// Validate and build an identity.
    ///
    /// Ids must be non-empty and free of the separator so the rendered
    /// string maps back to exactly one identity.
    pub fn new(
        organization_id: &'a str,
        document_id: &'a str,
        chunk_index: i32,
        key_version: i32,
    ) -> CryptoResult<Self> {
        check_id("organization id", organization_id)?;
        check_id("document id", document_id)?;
        if chunk_index < 0 {
            return Err(CryptoError::InvalidInput(format!(
                "chunk index must be non-negative, got {}",
                chunk_index
            )));
        }

        Ok(Self {
            organization_id,
            document_id,
            chunk_index,
            key_version,
        })
    }
}

impl fmt::Display for AssociatedData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{org}{sep}{doc}{sep}{idx}{sep}v{ver}",
            org = self.organization_id,
            doc = self.document_id,
            idx = self.chunk_index,
            ver = self.key_version,
            sep = AAD_SEPARATOR
        )
    }
}

/// Reject ids that are empty or contain the associated-data separator.
pub(crate) fn check_id(what: &str, value: &str) -> CryptoResult<()> {
    if value.is_empty() {
        return Err(CryptoError::InvalidInput(format!("{} must not be empty", what)));
    }
    if value.contains(AAD_SEPARATOR) {
        return Err(CryptoError::InvalidInput(format!(
            "{} must not contain '{}'",
            what, AAD_SEPARATOR
        )));
    }
    Ok(())
}

/// Seals and opens content chunks for any organization.
#[derive(Debug, Clone)]
pub struct ChunkVault {
    keys: Arc<KeyManager>,
}

impl ChunkVault {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    /// The underlying key hierarchy.
    pub fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Encrypt one chunk, provisioning the organization's DEK on first use.
    pub async fn seal_chunk(
        &self,
        organization_id: &str,
        document_id: &str,
        chunk_index: i32,
        content: &str,
    ) -> CryptoResult<EncryptedChunk> {
        // Validate before touching the store so bad ids never provision keys.
        AssociatedData::new(organization_id, document_id, chunk_index, 0)?;

        let resolved = self.keys.resolve_or_create_versioned(organization_id).await?;
        let aad =
            AssociatedData::new(organization_id, document_id, chunk_index, resolved.version)?
                .to_string();
        let sealed = encrypt_content(content, &resolved.key, &aad)?;

        trace!(
            subsystem = "crypto",
            component = "vault",
            op = "seal_chunk",
            org_id = %organization_id,
            document_id = %document_id,
            chunk_index,
            key_version = resolved.version,
            "Sealed chunk"
        );

        Ok(EncryptedChunk {
            organization_id: organization_id.to_string(),
            document_id: document_id.to_string(),
            chunk_index,
            key_version: resolved.version,
            ciphertext: base64_encode(&sealed.ciphertext),
            nonce: base64_encode(&sealed.nonce),
            associated_data: sealed.associated_data,
            content_hash: hash_content(content),
        })
    }

    /// Decrypt a chunk under the identity recorded in it.
    pub async fn open_chunk(&self, chunk: &EncryptedChunk) -> CryptoResult<String> {
        self.open_chunk_as(
            &chunk.organization_id,
            &chunk.document_id,
            chunk.chunk_index,
            chunk,
        )
        .await
    }

    /// Decrypt a chunk while claiming a specific identity.
    ///
    /// Uses the claimed organization's existing DEK (never provisions) and
    /// the claimed identity as associated data. Fails with
    /// [`CryptoError::Decryption`] if the chunk was sealed for anything else,
    /// and [`CryptoError::IntegrityMismatch`] if the plaintext no longer
    /// matches its stored hash.
    pub async fn open_chunk_as(
        &self,
        organization_id: &str,
        document_id: &str,
        chunk_index: i32,
        chunk: &EncryptedChunk,
    ) -> CryptoResult<String> {
        AssociatedData::new(organization_id, document_id, chunk_index, chunk.key_version)?;

        let resolved = self.keys.resolve_existing_versioned(organization_id).await?;
        if resolved.version != chunk.key_version {
            return Err(CryptoError::KeyVersionMismatch {
                found: chunk.key_version,
                current: resolved.version,
            });
        }

        let aad = AssociatedData::new(organization_id, document_id, chunk_index, resolved.version)?
            .to_string();
        let ciphertext = base64_decode(&chunk.ciphertext).map_err(|_| CryptoError::Decryption)?;
        let nonce = decode_nonce(&chunk.nonce)?;

        let plaintext =
            decrypt_content(&ciphertext, &nonce, &aad, &resolved.key).inspect_err(|_| {
                error!(
                    subsystem = "crypto",
                    component = "vault",
                    op = "open_chunk",
                    org_id = %organization_id,
                    document_id = %document_id,
                    chunk_index,
                    "Chunk failed authenticated decryption"
                );
            })?;

        if !validate_integrity(&plaintext, &chunk.content_hash) {
            error!(
                subsystem = "crypto",
                component = "vault",
                op = "open_chunk",
                org_id = %organization_id,
                document_id = %document_id,
                chunk_index,
                "Chunk content hash mismatch"
            );
            return Err(CryptoError::IntegrityMismatch);
        }

        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyringConfig;
    use crate::keys::MasterKey;
    use crate::store::MemoryKeyStore;

    fn vault() -> ChunkVault {
        let keys = KeyManager::new(
            KeyringConfig::new(MasterKey::generate()),
            Arc::new(MemoryKeyStore::new()),
        );
        ChunkVault::new(Arc::new(keys))
    }

    #[test]
    fn test_associated_data_format() {
        let aad = AssociatedData::new("org-a", "doc-1", 0, 1).unwrap();
        assert_eq!(aad.to_string(), "org-a|doc-1|0|v1");
    }

    #[test]
    fn test_associated_data_rejects_separator() {
        assert!(matches!(
            AssociatedData::new("org|a", "doc", 0, 1),
            Err(CryptoError::InvalidInput(_))
        ));
        assert!(matches!(
            AssociatedData::new("org", "doc|1", 0, 1),
            Err(CryptoError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_associated_data_rejects_empty_and_negative() {
        assert!(AssociatedData::new("", "doc", 0, 1).is_err());
        assert!(AssociatedData::new("org", "", 0, 1).is_err());
        assert!(AssociatedData::new("org", "doc", -1, 1).is_err());
    }

    #[tokio::test]
    async fn test_seal_open_roundtrip() {
        let vault = vault();
        let chunk = vault
            .seal_chunk("org-a", "doc-1", 2, "Quarterly revenue grew 12%.")
            .await
            .unwrap();

        assert_eq!(chunk.associated_data, "org-a|doc-1|2|v1");
        assert_eq!(chunk.content_hash, hash_content("Quarterly revenue grew 12%."));
        assert_eq!(
            vault.open_chunk(&chunk).await.unwrap(),
            "Quarterly revenue grew 12%."
        );
    }

    #[tokio::test]
    async fn test_open_as_other_position_fails() {
        let vault = vault();
        let chunk = vault.seal_chunk("org-a", "doc-1", 0, "text").await.unwrap();

        let result = vault.open_chunk_as("org-a", "doc-1", 1, &chunk).await;
        assert!(matches!(result, Err(CryptoError::Decryption)));

        let result = vault.open_chunk_as("org-a", "doc-2", 0, &chunk).await;
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[tokio::test]
    async fn test_open_as_unprovisioned_org_does_not_provision() {
        let vault = vault();
        let chunk = vault.seal_chunk("org-a", "doc-1", 0, "text").await.unwrap();

        let result = vault.open_chunk_as("org-b", "doc-1", 0, &chunk).await;
        assert!(matches!(result, Err(CryptoError::KeyNotFound(_))));
        assert_eq!(vault.keys().cache_len().await, 1);
    }

    #[tokio::test]
    async fn test_tampered_hash_detected() {
        let vault = vault();
        let mut chunk = vault.seal_chunk("org-a", "doc-1", 0, "text").await.unwrap();
        chunk.content_hash = hash_content("other text");

        let result = vault.open_chunk(&chunk).await;
        assert!(matches!(result, Err(CryptoError::IntegrityMismatch)));
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let vault = vault();
        let mut chunk = vault.seal_chunk("org-a", "doc-1", 0, "text").await.unwrap();
        chunk.key_version = 2;

        let result = vault.open_chunk(&chunk).await;
        assert!(matches!(
            result,
            Err(CryptoError::KeyVersionMismatch {
                found: 2,
                current: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_garbled_nonce_is_decryption_failure() {
        let vault = vault();
        let mut chunk = vault.seal_chunk("org-a", "doc-1", 0, "text").await.unwrap();
        chunk.nonce = base64_encode(&[0u8; 4]);

        let result = vault.open_chunk(&chunk).await;
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[tokio::test]
    async fn test_seal_rejects_bad_ids_without_provisioning() {
        let vault = vault();
        let result = vault.seal_chunk("org|a", "doc", 0, "text").await;
        assert!(matches!(result, Err(CryptoError::InvalidInput(_))));
        assert_eq!(vault.keys().cache_len().await, 0);
    }
}
