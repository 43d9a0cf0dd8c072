//! Error types for cryptographic and key-management operations.

use thiserror::Error;

/// Cryptographic operation errors.
///
/// Authentication failures (`Unwrap`, `Decryption`) carry no detail about
/// which input was wrong, so they cannot serve as an oracle.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Master key missing or malformed. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No DEK has been provisioned for the organization.
    #[error("No data key provisioned for organization {0}")]
    KeyNotFound(String),

    /// Wrapped DEK failed authentication under the master key.
    #[error("DEK unwrap failed")]
    Unwrap,

    /// Content failed authenticated decryption.
    #[error("Decryption failed")]
    Decryption,

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Chunk was sealed under a DEK version the organization no longer holds.
    #[error("Key version mismatch: chunk sealed with v{found}, organization holds v{current}")]
    KeyVersionMismatch { found: i32, current: i32 },

    /// Decrypted content does not match its stored hash.
    #[error("Content integrity check failed")]
    IntegrityMismatch,

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wrapped-key store failed.
    #[error("Key store error: {0}")]
    Store(#[from] ragvault_core::Error),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
