//! Core traits for ragvault abstractions.
//!
//! The key hierarchy depends only on these interfaces, so the Postgres
//! backend and the in-memory store are interchangeable.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::WrappedDekRecord;

/// Persistence for wrapped (KEK-encrypted) organization DEKs.
///
/// Implementations store at most one record per organization.
#[async_trait]
pub trait WrappedKeyStore: Send + Sync {
    /// Fetch the wrapped DEK for an organization, if one was provisioned.
    async fn get_wrapped_dek(&self, org_id: &str) -> Result<Option<WrappedDekRecord>>;

    /// Insert a wrapped DEK unless the organization already has one.
    ///
    /// Returns the record that is persisted after the call: `record` itself
    /// when the insert won, otherwise the pre-existing record. Concurrent
    /// first-use provisioning converges on whichever row landed first.
    async fn insert_wrapped_dek_if_absent(
        &self,
        org_id: &str,
        record: WrappedDekRecord,
    ) -> Result<WrappedDekRecord>;

    /// Unconditionally store a wrapped DEK, replacing any existing record.
    ///
    /// Reserved for operator tooling (re-wrapping under a new KEK). Callers
    /// must invalidate every process's DEK cache afterwards.
    async fn put_wrapped_dek(&self, org_id: &str, record: WrappedDekRecord) -> Result<()>;
}
