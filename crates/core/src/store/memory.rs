use super::ReferenceStore;
use crate::code::AccessCode;
use crate::error::{StoreError, StoreResult};
use crate::reference::FileReference;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process store. Nothing survives a restart.
///
/// Suitable for tests and single-instance deployments where shares are short-lived anyway.
#[derive(Debug, Default)]
pub struct MemoryStore {
    references: RwLock<HashMap<AccessCode, FileReference>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored references, expired ones included.
    pub async fn len(&self) -> usize {
        self.references.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.references.read().await.is_empty()
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn put(&self, reference: &FileReference) -> StoreResult<()> {
        let mut references = self.references.write().await;
        if let Some(existing) = references.get(&reference.code) {
            if !existing.is_expired(Utc::now()) {
                return Err(StoreError::DuplicateKey(reference.code));
            }
        }
        references.insert(reference.code, reference.clone());
        Ok(())
    }

    async fn get(&self, code: &AccessCode) -> StoreResult<Option<FileReference>> {
        let now = Utc::now();
        Ok(self
            .references
            .read()
            .await
            .get(code)
            .filter(|r| !r.is_expired(now))
            .cloned())
    }

    async fn take(&self, code: &AccessCode) -> StoreResult<Option<FileReference>> {
        let now = Utc::now();
        Ok(self
            .references
            .write()
            .await
            .remove(code)
            .filter(|r| !r.is_expired(now)))
    }

    async fn delete(&self, code: &AccessCode) -> StoreResult<bool> {
        Ok(self.references.write().await.remove(code).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut references = self.references.write().await;
        let before = references.len();
        references.retain(|_, r| !r.is_expired(now));
        Ok(before - references.len())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
