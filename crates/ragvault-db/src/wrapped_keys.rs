//! PostgreSQL store for wrapped organization DEKs.
//!
//! One row per organization in `organization_keys`. First-use provisioning
//! relies on the primary key: the insert is conditional, and a writer that
//! loses the race reads back the row that won.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::debug;

use ragvault_core::defaults::ORGANIZATION_KEYS_TABLE;
use ragvault_core::{Error, Result, WrappedDekRecord, WrappedKeyStore};

/// PostgreSQL implementation of [`WrappedKeyStore`].
#[derive(Debug, Clone)]
pub struct PgWrappedKeyStore {
    pool: Pool<Postgres>,
}

impl PgWrappedKeyStore {
    /// Create a new PgWrappedKeyStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Remove an organization's wrapped DEK.
    ///
    /// Chunks sealed under the removed key become unreadable. Returns whether
    /// a row was deleted.
    pub async fn delete_wrapped_dek(&self, org_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM organization_keys WHERE organization_id = $1")
            .bind(org_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "wrapped_keys",
            op = "delete",
            db_table = ORGANIZATION_KEYS_TABLE,
            org_id = %org_id,
            result_count = result.rows_affected(),
            "Deleted wrapped data key"
        );
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl WrappedKeyStore for PgWrappedKeyStore {
    async fn get_wrapped_dek(&self, org_id: &str) -> Result<Option<WrappedDekRecord>> {
        let record = sqlx::query_as::<_, WrappedDekRecord>(
            r#"
            SELECT key_version, wrapped_dek
            FROM organization_keys
            WHERE organization_id = $1
            "#,
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "wrapped_keys",
            op = "get",
            db_table = ORGANIZATION_KEYS_TABLE,
            org_id = %org_id,
            found = record.is_some(),
            "Fetched wrapped data key"
        );
        Ok(record)
    }

    async fn insert_wrapped_dek_if_absent(
        &self,
        org_id: &str,
        record: WrappedDekRecord,
    ) -> Result<WrappedDekRecord> {
        let inserted = sqlx::query_as::<_, WrappedDekRecord>(
            r#"
            INSERT INTO organization_keys (organization_id, key_version, wrapped_dek)
            VALUES ($1, $2, $3)
            ON CONFLICT (organization_id) DO NOTHING
            RETURNING key_version, wrapped_dek
            "#,
        )
        .bind(org_id)
        .bind(record.key_version)
        .bind(&record.wrapped_dek)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if let Some(inserted) = inserted {
            debug!(
                subsystem = "database",
                component = "wrapped_keys",
                op = "insert_if_absent",
                db_table = ORGANIZATION_KEYS_TABLE,
                org_id = %org_id,
                inserted = true,
                "Inserted wrapped data key"
            );
            return Ok(inserted);
        }

        // Conflict: another writer's row is authoritative.
        debug!(
            subsystem = "database",
            component = "wrapped_keys",
            op = "insert_if_absent",
            db_table = ORGANIZATION_KEYS_TABLE,
            org_id = %org_id,
            inserted = false,
            "Wrapped data key already present"
        );
        self.get_wrapped_dek(org_id).await?.ok_or_else(|| {
            Error::Internal(format!(
                "wrapped key for organization {} vanished after insert conflict",
                org_id
            ))
        })
    }

    async fn put_wrapped_dek(&self, org_id: &str, record: WrappedDekRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO organization_keys (organization_id, key_version, wrapped_dek)
            VALUES ($1, $2, $3)
            ON CONFLICT (organization_id) DO UPDATE
            SET key_version = EXCLUDED.key_version,
                wrapped_dek = EXCLUDED.wrapped_dek,
                updated_at = NOW()
            "#,
        )
        .bind(org_id)
        .bind(record.key_version)
        .bind(&record.wrapped_dek)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "wrapped_keys",
            op = "put",
            db_table = ORGANIZATION_KEYS_TABLE,
            org_id = %org_id,
            key_version = record.key_version,
            "Stored wrapped data key"
        );
        Ok(())
    }
}
