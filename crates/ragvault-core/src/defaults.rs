//! Centralized default constants for ragvault.
//!
//! Crates reference these instead of defining their own magic numbers or
//! environment variable names.

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Environment variable holding the base64-encoded 256-bit master key (KEK).
pub const MASTER_KEY_ENV: &str = "MASTER_ENCRYPTION_KEY";

/// Environment variable bounding the number of cached plaintext DEKs.
pub const DEK_CACHE_CAPACITY_ENV: &str = "DEK_CACHE_CAPACITY";

/// Environment variable holding the Postgres connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

// =============================================================================
// KEY HIERARCHY
// =============================================================================

/// Default maximum number of plaintext DEKs held in the in-process cache.
///
/// One entry per organization; 10k tenants of 32-byte keys stays well under
/// a megabyte. A capacity of `0` in configuration means unbounded.
pub const DEK_CACHE_CAPACITY: usize = 10_000;

/// Version assigned to newly provisioned organization DEKs.
pub const INITIAL_KEY_VERSION: i32 = 1;

/// Separator used when rendering associated data for a content chunk.
pub const AAD_SEPARATOR: char = '|';

// =============================================================================
// DATABASE
// =============================================================================

/// Table holding one wrapped DEK per organization.
pub const ORGANIZATION_KEYS_TABLE: &str = "organization_keys";

/// Table holding encrypted content chunks.
pub const ENCRYPTED_CHUNKS_TABLE: &str = "encrypted_chunks";
