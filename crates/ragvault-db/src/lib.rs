//! # ragvault-db
//!
//! PostgreSQL storage for ragvault.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgWrappedKeyStore`], the persistent [`WrappedKeyStore`] behind the key hierarchy
//! - [`PgEncryptedChunkRepository`] for sealed content chunks
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragvault_crypto::{ChunkVault, KeyManager};
//! use ragvault_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/ragvault").await?;
//!     let keys = KeyManager::from_env(Arc::new(db.wrapped_keys.clone()))?;
//!     let vault = ChunkVault::new(Arc::new(keys));
//!
//!     let chunk = vault.seal_chunk("org-1", "doc-1", 0, "Hello, world!").await?;
//!     db.chunks.insert(&chunk).await?;
//!     Ok(())
//! }
//! ```
pub mod chunks;
pub mod pool;
pub mod wrapped_keys;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use ragvault_core::*;

pub use chunks::{PgEncryptedChunkRepository, StoredChunk};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use wrapped_keys::PgWrappedKeyStore;

/// Combined database context with all repositories.
#[derive(Debug, Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Wrapped per-organization DEKs.
    pub wrapped_keys: PgWrappedKeyStore,
    /// Encrypted content chunks.
    pub chunks: PgEncryptedChunkRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            wrapped_keys: PgWrappedKeyStore::new(pool.clone()),
            chunks: PgEncryptedChunkRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
