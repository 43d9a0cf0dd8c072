//! Structured logging field name constants for ragvault.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query key-management events by the same names
//! regardless of which crate emitted them.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Authentication failures on unwrap/decrypt (tampering, wrong KEK) |
//! | WARN  | Recoverable issue, e.g. a lost DEK provisioning race |
//! | INFO  | Lifecycle events: startup, DEK provisioning, cache invalidation |
//! | DEBUG | Cache hits/misses, store reads, decision points |
//! | TRACE | Per-chunk seal/open events |
//!
//! Secret material (KEK, DEK, plaintext) is never logged.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "crypto", "database", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "keyring", "cipher", "vault", "pool", "wrapped_keys"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "resolve_or_create", "unwrap", "seal_chunk", "invalidate"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Organization (tenant) identifier.
pub const ORG_ID: &str = "org_id";

/// Document identifier a chunk belongs to.
pub const DOCUMENT_ID: &str = "document_id";

/// Position of a chunk within its document.
pub const CHUNK_INDEX: &str = "chunk_index";

/// Version of the organization DEK in use.
pub const KEY_VERSION: &str = "key_version";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of DEKs currently held in the in-process cache.
pub const CACHE_SIZE: &str = "cache_size";

/// Number of rows/entries affected by an operation.
pub const RESULT_COUNT: &str = "result_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Every field name above, for log-pipeline schemas.
pub const ALL_FIELDS: &[&str] = &[
    SUBSYSTEM,
    COMPONENT,
    OPERATION,
    ORG_ID,
    DOCUMENT_ID,
    CHUNK_INDEX,
    KEY_VERSION,
    DURATION_MS,
    CACHE_SIZE,
    RESULT_COUNT,
    POOL_SIZE,
    POOL_IDLE,
    DB_TABLE,
    ERROR_MSG,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_unique_snake_case() {
        let mut seen = std::collections::HashSet::new();
        for name in ALL_FIELDS {
            assert!(seen.insert(*name), "duplicate field {}", name);
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn test_field_names_match_call_sites() {
        assert_eq!(OPERATION, "op");
        assert_eq!(ERROR_MSG, "error");
        assert!(!ALL_FIELDS.contains(&"success"));
    }
}
