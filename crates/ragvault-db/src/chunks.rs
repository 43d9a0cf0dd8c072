//! Repository for envelope-encrypted content chunks.
//!
//! Rows are opaque to this layer: ciphertext, nonce and associated data are
//! stored exactly as produced when sealing, keyed by
//! `(organization_id, document_id, chunk_index)`.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tracing::debug;

use ragvault_core::defaults::ENCRYPTED_CHUNKS_TABLE;
use ragvault_core::{EncryptedChunk, Error, Result};

/// A stored chunk with its insertion time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredChunk {
    #[sqlx(flatten)]
    pub chunk: EncryptedChunk,
    pub created_at: DateTime<Utc>,
}

/// PostgreSQL implementation of encrypted chunk storage.
#[derive(Debug, Clone)]
pub struct PgEncryptedChunkRepository {
    pool: Pool<Postgres>,
}

impl PgEncryptedChunkRepository {
    /// Create a new PgEncryptedChunkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a chunk, replacing any chunk already stored in the same slot.
    pub async fn insert(&self, chunk: &EncryptedChunk) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO encrypted_chunks (
                organization_id, document_id, chunk_index, key_version,
                ciphertext, nonce, associated_data, content_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (organization_id, document_id, chunk_index) DO UPDATE
            SET key_version = EXCLUDED.key_version,
                ciphertext = EXCLUDED.ciphertext,
                nonce = EXCLUDED.nonce,
                associated_data = EXCLUDED.associated_data,
                content_hash = EXCLUDED.content_hash,
                created_at = NOW()
            "#,
        )
        .bind(&chunk.organization_id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(chunk.key_version)
        .bind(&chunk.ciphertext)
        .bind(&chunk.nonce)
        .bind(&chunk.associated_data)
        .bind(&chunk.content_hash)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "chunks",
            op = "insert",
            db_table = ENCRYPTED_CHUNKS_TABLE,
            org_id = %chunk.organization_id,
            document_id = %chunk.document_id,
            chunk_index = chunk.chunk_index,
            "Stored encrypted chunk"
        );
        Ok(())
    }

    /// Insert several chunks in one transaction.
    pub async fn insert_batch(&self, chunks: &[EncryptedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO encrypted_chunks (
                    organization_id, document_id, chunk_index, key_version,
                    ciphertext, nonce, associated_data, content_hash
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (organization_id, document_id, chunk_index) DO UPDATE
                SET key_version = EXCLUDED.key_version,
                    ciphertext = EXCLUDED.ciphertext,
                    nonce = EXCLUDED.nonce,
                    associated_data = EXCLUDED.associated_data,
                    content_hash = EXCLUDED.content_hash,
                    created_at = NOW()
                "#,
            )
            .bind(&chunk.organization_id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(chunk.key_version)
            .bind(&chunk.ciphertext)
            .bind(&chunk.nonce)
            .bind(&chunk.associated_data)
            .bind(&chunk.content_hash)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "chunks",
            op = "insert_batch",
            db_table = ENCRYPTED_CHUNKS_TABLE,
            result_count = chunks.len(),
            "Stored encrypted chunk batch"
        );
        Ok(())
    }

    /// Fetch one chunk by its slot.
    pub async fn fetch(
        &self,
        org_id: &str,
        document_id: &str,
        chunk_index: i32,
    ) -> Result<Option<EncryptedChunk>> {
        let chunk = sqlx::query_as::<_, EncryptedChunk>(
            r#"
            SELECT organization_id, document_id, chunk_index, key_version,
                   ciphertext, nonce, associated_data, content_hash
            FROM encrypted_chunks
            WHERE organization_id = $1 AND document_id = $2 AND chunk_index = $3
            "#,
        )
        .bind(org_id)
        .bind(document_id)
        .bind(chunk_index)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(chunk)
    }

    /// All chunks of a document, in chunk order.
    pub async fn list_for_document(
        &self,
        org_id: &str,
        document_id: &str,
    ) -> Result<Vec<StoredChunk>> {
        let chunks = sqlx::query_as::<_, StoredChunk>(
            r#"
            SELECT organization_id, document_id, chunk_index, key_version,
                   ciphertext, nonce, associated_data, content_hash, created_at
            FROM encrypted_chunks
            WHERE organization_id = $1 AND document_id = $2
            ORDER BY chunk_index
            "#,
        )
        .bind(org_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "chunks",
            op = "list_for_document",
            db_table = ENCRYPTED_CHUNKS_TABLE,
            org_id = %org_id,
            document_id = %document_id,
            result_count = chunks.len(),
            "Listed encrypted chunks"
        );
        Ok(chunks)
    }

    /// Number of chunks an organization holds under a given key version.
    ///
    /// Nonzero counts for old versions mean re-encryption is still pending.
    pub async fn count_for_key_version(&self, org_id: &str, key_version: i32) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM encrypted_chunks
            WHERE organization_id = $1 AND key_version = $2
            "#,
        )
        .bind(org_id)
        .bind(key_version)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(count)
    }

    /// Delete every chunk of a document. Returns the number removed.
    pub async fn delete_document(&self, org_id: &str, document_id: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM encrypted_chunks
            WHERE organization_id = $1 AND document_id = $2
            "#,
        )
        .bind(org_id)
        .bind(document_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "chunks",
            op = "delete_document",
            db_table = ENCRYPTED_CHUNKS_TABLE,
            org_id = %org_id,
            document_id = %document_id,
            result_count = result.rows_affected(),
            "Deleted encrypted chunks"
        );
        Ok(result.rows_affected())
    }
}
