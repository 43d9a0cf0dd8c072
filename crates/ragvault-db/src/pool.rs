//! Postgres pool construction for the key and chunk stores.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use ragvault_core::{Error, Result};

/// Key lookups are short point queries, so a small pool serves many
/// concurrent requests.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

pub const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// Pool sizing plus an optional schema every connection is pinned to.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// How long a query waits for a free connection.
    pub acquire_timeout: Duration,
    /// Schema put first on every connection's `search_path`.
    pub search_path: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            search_path: None,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Pin every pooled connection to `schema`, then `public`.
    ///
    /// The name is interpolated into `SET search_path`, so it is checked
    /// with [`validate_schema_name`] when the pool is built.
    pub fn search_path(mut self, schema: impl Into<String>) -> Self {
        self.search_path = Some(schema.into());
        self
    }
}

/// Connect with [`PoolConfig::default`].
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Connect with explicit sizing and schema.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    if let Some(schema) = &config.search_path {
        validate_schema_name(schema)?;
    }

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS))
        .max_lifetime(Duration::from_secs(DEFAULT_MAX_LIFETIME_SECS));

    if let Some(schema) = config.search_path.clone() {
        options = options.after_connect(move |conn, _meta| {
            let statement = format!("SET search_path TO {}, public", schema);
            Box::pin(async move {
                sqlx::query(&statement).execute(&mut *conn).await?;
                Ok(())
            })
        });
    }

    let pool = options
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        search_path = config.search_path.as_deref().unwrap_or("public"),
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Connected to Postgres"
    );
    Ok(pool)
}

/// Accept lowercase identifiers only: `[a-z_][a-z0-9_]*`, at most 63 bytes.
pub fn validate_schema_name(schema: &str) -> Result<()> {
    let mut chars = schema.chars();
    let valid_start = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_lowercase());
    let valid_rest = chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit());

    if !valid_start || !valid_rest || schema.len() > 63 {
        return Err(Error::InvalidInput(format!(
            "invalid schema name: {:?}",
            schema
        )));
    }
    Ok(())
}
