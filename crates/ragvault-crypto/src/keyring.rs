//! Key hierarchy manager: resolves, provisions, wraps and caches
//! per-organization DEKs under the process master key.
//!
//! ## Resolution Order
//!
//! 1. In-process LRU cache
//! 2. Wrapped DEK from the [`WrappedKeyStore`], unwrapped under the KEK
//! 3. (create path only) Generate, wrap and conditionally insert a new DEK;
//!    if another writer provisioned first, adopt the persisted winner
//!
//! The cache is strictly an optimization over the store. Each process keeps
//! its own, so invalidation after a key change must reach every instance.
//! Every invalidation bumps a generation counter; a store read that started
//! under an older generation serves its caller but is not cached.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use ragvault_core::{WrappedDekRecord, WrappedKeyStore};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::KeyringConfig;
use crate::error::{CryptoError, CryptoResult};
use crate::format::{ALGORITHM, KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::keys::{unwrap_key, wrap_key, DataKey, MasterKey};
use crate::vault::check_id;

/// A DEK together with the version it is stored under.
#[derive(Debug, Clone)]
pub struct VersionedKey {
    pub version: i32,
    pub key: DataKey,
}

/// Operational snapshot of the key hierarchy. Contains no key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringInfo {
    pub algorithm: String,
    pub key_size_bits: usize,
    pub nonce_size_bits: usize,
    pub tag_size_bits: usize,
    pub cache_size: usize,
    /// `None` when the cache is unbounded.
    pub cache_capacity: Option<usize>,
}

/// Cached DEKs plus the invalidation generation they were loaded under.
struct KeyCache {
    entries: LruCache<String, VersionedKey>,
    generation: u64,
}

/// Owns the master key and the per-process DEK cache.
///
/// Construct once at startup and share behind an `Arc`.
pub struct KeyManager {
    master_key: MasterKey,
    store: Arc<dyn WrappedKeyStore>,
    cache: Mutex<KeyCache>,
    cache_capacity: Option<NonZeroUsize>,
}

impl KeyManager {
    /// Create a key manager from validated configuration.
    pub fn new(config: KeyringConfig, store: Arc<dyn WrappedKeyStore>) -> Self {
        let entries = match config.cache_capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        info!(
            subsystem = "crypto",
            component = "keyring",
            op = "init",
            algorithm = ALGORITHM,
            cache_capacity = config.cache_capacity.map(NonZeroUsize::get),
            "Key hierarchy initialized"
        );

        Self {
            master_key: config.master_key,
            store,
            cache: Mutex::new(KeyCache {
                entries,
                generation: 0,
            }),
            cache_capacity: config.cache_capacity,
        }
    }

    /// Load configuration from the environment and create a key manager.
    ///
    /// Call at process startup: a missing or malformed master key must stop
    /// the process before it serves encrypted content.
    pub fn from_env(store: Arc<dyn WrappedKeyStore>) -> CryptoResult<Self> {
        let config = KeyringConfig::from_env().inspect_err(|e| {
            error!(
                subsystem = "crypto",
                component = "keyring",
                op = "init",
                error = %e,
                "Master key configuration invalid"
            );
        })?;
        Ok(Self::new(config, store))
    }

    /// Resolve an organization's DEK, provisioning one on first use.
    pub async fn resolve_or_create_data_key(&self, org_id: &str) -> CryptoResult<DataKey> {
        Ok(self.resolve_or_create_versioned(org_id).await?.key)
    }

    /// Resolve an organization's DEK without provisioning.
    ///
    /// Fails with [`CryptoError::KeyNotFound`] when none is stored.
    pub async fn resolve_existing_data_key(&self, org_id: &str) -> CryptoResult<DataKey> {
        Ok(self.resolve_existing_versioned(org_id).await?.key)
    }

    /// Versioned form of [`resolve_or_create_data_key`](Self::resolve_or_create_data_key).
    pub async fn resolve_or_create_versioned(&self, org_id: &str) -> CryptoResult<VersionedKey> {
        validate_org_id(org_id)?;

        let generation = self.generation().await;
        if let Some(resolved) = self.lookup(org_id, generation).await? {
            return Ok(resolved);
        }

        let start = Instant::now();
        let candidate = DataKey::generate();
        let wrapped = self.wrap_key(&candidate)?;

        let persisted = self
            .store
            .insert_wrapped_dek_if_absent(org_id, WrappedDekRecord::initial(wrapped.clone()))
            .await?;

        let resolved = if persisted.wrapped_dek == wrapped {
            info!(
                subsystem = "crypto",
                component = "keyring",
                op = "provision",
                org_id = %org_id,
                key_version = persisted.key_version,
                duration_ms = start.elapsed().as_millis() as u64,
                "Provisioned data key for organization"
            );
            VersionedKey {
                version: persisted.key_version,
                key: candidate,
            }
        } else {
            warn!(
                subsystem = "crypto",
                component = "keyring",
                op = "provision",
                org_id = %org_id,
                key_version = persisted.key_version,
                "Concurrent provisioning detected, adopting persisted data key"
            );
            VersionedKey {
                version: persisted.key_version,
                key: self.unwrap_for(Some(org_id), &persisted.wrapped_dek)?,
            }
        };

        self.remember(org_id, resolved.clone(), generation).await;
        Ok(resolved)
    }

    /// Versioned form of [`resolve_existing_data_key`](Self::resolve_existing_data_key).
    pub async fn resolve_existing_versioned(&self, org_id: &str) -> CryptoResult<VersionedKey> {
        validate_org_id(org_id)?;

        let generation = self.generation().await;
        self.lookup(org_id, generation).await?.ok_or_else(|| {
            debug!(
                subsystem = "crypto",
                component = "keyring",
                op = "resolve_existing",
                org_id = %org_id,
                "No data key provisioned"
            );
            CryptoError::KeyNotFound(org_id.to_string())
        })
    }

    /// Wrap a DEK under the master key.
    pub fn wrap_key(&self, dek: &DataKey) -> CryptoResult<String> {
        wrap_key(&self.master_key, dek)
    }

    /// Unwrap a DEK under the master key.
    pub fn unwrap_key(&self, wrapped: &str) -> CryptoResult<DataKey> {
        self.unwrap_for(None, wrapped)
    }

    /// Drop one organization's cached DEK, or the whole cache for `None`.
    ///
    /// Store reads already in flight still return to their callers, but their
    /// results are not cached.
    pub async fn invalidate_cache(&self, org_id: Option<&str>) {
        let mut cache = self.cache.lock().await;
        cache.generation += 1;
        match org_id {
            Some(id) => {
                let removed = cache.entries.pop(id).is_some();
                info!(
                    subsystem = "crypto",
                    component = "keyring",
                    op = "invalidate",
                    org_id = %id,
                    removed,
                    cache_size = cache.entries.len(),
                    "Invalidated cached data key"
                );
            }
            None => {
                let count = cache.entries.len();
                cache.entries.clear();
                info!(
                    subsystem = "crypto",
                    component = "keyring",
                    op = "invalidate_all",
                    result_count = count,
                    "Cleared data key cache"
                );
            }
        }
    }

    /// Number of DEKs currently cached.
    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.entries.len()
    }

    /// Algorithm parameters and cache occupancy.
    pub async fn info(&self) -> KeyringInfo {
        KeyringInfo {
            algorithm: ALGORITHM.to_string(),
            key_size_bits: KEY_LEN * 8,
            nonce_size_bits: NONCE_LEN * 8,
            tag_size_bits: TAG_LEN * 8,
            cache_size: self.cache_len().await,
            cache_capacity: self.cache_capacity.map(NonZeroUsize::get),
        }
    }

    async fn generation(&self) -> u64 {
        self.cache.lock().await.generation
    }

    /// Cache, then store. `Ok(None)` when the organization has no DEK.
    ///
    /// `generation` must be read before any store access for this request.
    async fn lookup(&self, org_id: &str, generation: u64) -> CryptoResult<Option<VersionedKey>> {
        {
            let mut cache = self.cache.lock().await;
            if let Some(hit) = cache.entries.get(org_id) {
                debug!(
                    subsystem = "crypto",
                    component = "keyring",
                    op = "lookup",
                    org_id = %org_id,
                    "Data key cache hit"
                );
                return Ok(Some(hit.clone()));
            }
        }

        let Some(record) = self.store.get_wrapped_dek(org_id).await? else {
            return Ok(None);
        };

        debug!(
            subsystem = "crypto",
            component = "keyring",
            op = "lookup",
            org_id = %org_id,
            key_version = record.key_version,
            "Loaded wrapped data key from store"
        );

        let resolved = VersionedKey {
            version: record.key_version,
            key: self.unwrap_for(Some(org_id), &record.wrapped_dek)?,
        };
        self.remember(org_id, resolved.clone(), generation).await;
        Ok(Some(resolved))
    }

    fn unwrap_for(&self, org_id: Option<&str>, wrapped: &str) -> CryptoResult<DataKey> {
        unwrap_key(&self.master_key, wrapped).inspect_err(|_| {
            error!(
                subsystem = "crypto",
                component = "keyring",
                op = "unwrap",
                org_id = org_id.unwrap_or("-"),
                "DEK unwrap failed: wrong master key or corrupted wrapped key"
            );
        })
    }

    /// Cache `resolved` unless an invalidation happened since `generation`.
    async fn remember(&self, org_id: &str, resolved: VersionedKey, generation: u64) {
        let mut cache = self.cache.lock().await;
        if cache.generation != generation {
            debug!(
                subsystem = "crypto",
                component = "keyring",
                op = "remember",
                org_id = %org_id,
                key_version = resolved.version,
                "Cache invalidated during load, not caching data key"
            );
            return;
        }
        cache.entries.put(org_id.to_string(), resolved);
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("master_key", &self.master_key)
            .field("cache_capacity", &self.cache_capacity)
            .finish_non_exhaustive()
    }
}

/// Same rules `AssociatedData` applies, so every provisioned key is usable
/// for sealing chunks.
fn validate_org_id(org_id: &str) -> CryptoResult<()> {
    if org_id.trim().is_empty() {
        return Err(CryptoError::InvalidInput(
            "organization id must not be empty".to_string(),
        ));
    }
    check_id("organization id", org_id)
}
