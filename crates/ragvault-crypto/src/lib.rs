//! # ragvault-crypto
//!
//! Envelope encryption for multi-tenant document content.
//!
//! Each organization gets its own data-encryption key (DEK). DEKs are
//! wrapped by a process-wide master key (KEK) and persisted only in wrapped
//! form; plaintext DEKs live in a bounded in-process cache.
//!
//! ## Cryptographic Primitives
//!
//! - **Cipher**: AES-256-GCM (AEAD), 96-bit random nonce per encryption
//! - **Key wrapping**: AES-256-GCM under the KEK, stored as
//!   `base64(nonce ‖ ciphertext ‖ tag)`
//! - **Chunk binding**: associated data `organization|document|index|vN`
//! - **Integrity**: SHA-256 content hash, hex-encoded
//!
//! ## Examples
//!
//! ### Encrypt and Decrypt Content
//!
//! ```rust
//! use ragvault_crypto::{decrypt_content, encrypt_content, DataKey};
//!
//! let dek = DataKey::generate();
//! let sealed = encrypt_content("secret-for-A", &dek, "orgA|doc1|0").unwrap();
//!
//! let plaintext =
//!     decrypt_content(&sealed.ciphertext, &sealed.nonce, "orgA|doc1|0", &dek).unwrap();
//! assert_eq!(plaintext, "secret-for-A");
//!
//! // Another tenant's identity does not authenticate.
//! assert!(decrypt_content(&sealed.ciphertext, &sealed.nonce, "orgB|doc1|0", &dek).is_err());
//! ```
//!
//! ### Seal Chunks Through the Key Hierarchy
//!
//! ```rust
//! use std::sync::Arc;
//! use ragvault_crypto::{ChunkVault, KeyManager, KeyringConfig, MasterKey, MemoryKeyStore};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let keys = KeyManager::new(
//!     KeyringConfig::new(MasterKey::generate()),
//!     Arc::new(MemoryKeyStore::new()),
//! );
//! let vault = ChunkVault::new(Arc::new(keys));
//!
//! let chunk = vault.seal_chunk("org-a", "doc-1", 0, "hello").await.unwrap();
//! assert_eq!(vault.open_chunk(&chunk).await.unwrap(), "hello");
//! # });
//! ```

pub mod cipher;
pub mod config;
pub mod error;
pub mod format;
pub mod integrity;
pub mod keyring;
pub mod keys;
pub mod store;
pub mod vault;

// Re-export commonly used types
pub use cipher::{decrypt_content, encrypt_content, EncryptedContent};
pub use config::KeyringConfig;
pub use error::{CryptoError, CryptoResult};
pub use format::{base64_decode, base64_encode};
pub use integrity::{hash_content, validate_integrity};
pub use keyring::{KeyManager, KeyringInfo, VersionedKey};
pub use keys::{generate_master_key, unwrap_key, wrap_key, DataKey, MasterKey};
pub use store::MemoryKeyStore;
pub use vault::{AssociatedData, ChunkVault};
