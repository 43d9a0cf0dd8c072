//! # ragvault-core
//!
//! Core types, traits, and abstractions for ragvault.
//!
//! This crate provides the shared error type, the persisted models for
//! wrapped organization keys and encrypted chunks, and the storage trait the
//! key hierarchy is written against.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
