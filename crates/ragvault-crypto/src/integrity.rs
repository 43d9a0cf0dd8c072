//! Content fingerprints for tamper detection independent of AEAD.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the UTF-8 bytes of `content`.
pub fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Check `content` against a previously stored [`hash_content`] value.
///
/// Advisory: returns `false` on mismatch rather than an error, leaving the
/// caller to decide whether a mismatch blocks the response.
pub fn validate_integrity(content: &str, stored_hash: &str) -> bool {
    hash_content(content) == stored_hash
}
