//! Key hierarchy configuration.
//!
//! Environment variables:
//!   MASTER_ENCRYPTION_KEY - base64 256-bit KEK (required)
//!   DEK_CACHE_CAPACITY    - max cached DEKs, `0` for unbounded (default: 10000)

use std::num::NonZeroUsize;

use ragvault_core::defaults::{DEK_CACHE_CAPACITY, DEK_CACHE_CAPACITY_ENV, MASTER_KEY_ENV};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::MasterKey;

/// Validated configuration for a [`KeyManager`](crate::keyring::KeyManager).
#[derive(Debug, Clone)]
pub struct KeyringConfig {
    pub master_key: MasterKey,
    /// `None` disables eviction.
    pub cache_capacity: Option<NonZeroUsize>,
}

impl KeyringConfig {
    /// Configuration with the default cache capacity.
    pub fn new(master_key: MasterKey) -> Self {
        Self {
            master_key,
            cache_capacity: NonZeroUsize::new(DEK_CACHE_CAPACITY),
        }
    }

    /// Override the cache capacity (`0` for unbounded).
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = NonZeroUsize::new(capacity);
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> CryptoResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> CryptoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoded = lookup(MASTER_KEY_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CryptoError::Config(format!("{} is not set", MASTER_KEY_ENV)))?;
        let master_key = MasterKey::from_base64(&encoded)?;

        let capacity = match lookup(DEK_CACHE_CAPACITY_ENV) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                CryptoError::Config(format!(
                    "{} must be a non-negative integer, got {:?}",
                    DEK_CACHE_CAPACITY_ENV, raw
                ))
            })?,
            None => DEK_CACHE_CAPACITY,
        };

        Ok(Self::new(master_key).with_cache_capacity(capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::base64_encode;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config =
            KeyringConfig::from_lookup(lookup(&[(MASTER_KEY_ENV, base64_encode(&[1u8; 32]))]))
                .unwrap();
        assert_eq!(
            config.cache_capacity.map(NonZeroUsize::get),
            Some(DEK_CACHE_CAPACITY)
        );
    }

    #[test]
    fn test_from_lookup_missing_key() {
        let result = KeyringConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(CryptoError::Config(msg)) if msg.contains(MASTER_KEY_ENV)));
    }

    #[test]
    fn test_from_lookup_blank_key() {
        let result = KeyringConfig::from_lookup(lookup(&[(MASTER_KEY_ENV, "   ".to_string())]));
        assert!(matches!(result, Err(CryptoError::Config(_))));
    }

    #[test]
    fn test_from_lookup_short_key() {
        let result =
            KeyringConfig::from_lookup(lookup(&[(MASTER_KEY_ENV, base64_encode(&[1u8; 16]))]));
        assert!(matches!(result, Err(CryptoError::Config(_))));
    }

    #[test]
    fn test_from_lookup_unbounded_cache() {
        let config = KeyringConfig::from_lookup(lookup(&[
            (MASTER_KEY_ENV, base64_encode(&[1u8; 32])),
            (DEK_CACHE_CAPACITY_ENV, "0".to_string()),
        ]))
        .unwrap();
        assert!(config.cache_capacity.is_none());
    }

    #[test]
    fn test_from_lookup_bad_capacity() {
        let result = KeyringConfig::from_lookup(lookup(&[
            (MASTER_KEY_ENV, base64_encode(&[1u8; 32])),
            (DEK_CACHE_CAPACITY_ENV, "lots".to_string()),
        ]));
        assert!(matches!(result, Err(CryptoError::Config(_))));
    }
}
