//! In-memory wrapped-key store.
//!
//! Suitable for tests and single-process deployments. Counts reads and
//! writes so callers can assert on store traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ragvault_core::{Result, WrappedDekRecord, WrappedKeyStore};
use tokio::sync::Mutex;

/// [`WrappedKeyStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    records: Mutex<HashMap<String, WrappedDekRecord>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get_wrapped_dek` calls served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of insert/put calls served.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of organizations with a stored DEK.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl WrappedKeyStore for MemoryKeyStore {
    async fn get_wrapped_dek(&self, org_id: &str) -> Result<Option<WrappedDekRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().await.get(org_id).cloned())
    }

    async fn insert_wrapped_dek_if_absent(
        &self,
        org_id: &str,
        record: WrappedDekRecord,
    ) -> Result<WrappedDekRecord> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().await;
        Ok(records.entry(org_id.to_string()).or_insert(record).clone())
    }

    async fn put_wrapped_dek(&self, org_id: &str, record: WrappedDekRecord) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.records.lock().await.insert(org_id.to_string(), record);
        Ok(())
    }
}
