//! Deterministic generators and misbehaving stores for unit tests.

use crate::code::{AccessCode, CodeGenerator};
use crate::error::StoreResult;
use crate::reference::FileReference;
use crate::store::ReferenceStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Yields a fixed list of six-digit codes in order.
pub(crate) struct SequenceGenerator {
    codes: Mutex<VecDeque<u32>>,
}

impl SequenceGenerator {
    pub(crate) fn new(codes: &[u32]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().copied().collect()),
        }
    }
}

impl CodeGenerator for SequenceGenerator {
    fn generate(&self) -> AccessCode {
        let value = self
            .codes
            .lock()
            .unwrap()
            .pop_front()
            .expect("sequence generator exhausted");
        AccessCode::new(value, 6).unwrap()
    }
}

/// A store whose every call hangs, for exercising timeouts.
pub(crate) struct StalledStore;

#[async_trait]
impl ReferenceStore for StalledStore {
    async fn put(&self, _reference: &FileReference) -> StoreResult<()> {
        std::future::pending().await
    }

    async fn get(&self, _code: &AccessCode) -> StoreResult<Option<FileReference>> {
        std::future::pending().await
    }

    async fn take(&self, _code: &AccessCode) -> StoreResult<Option<FileReference>> {
        std::future::pending().await
    }

    async fn delete(&self, _code: &AccessCode) -> StoreResult<bool> {
        std::future::pending().await
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> StoreResult<usize> {
        std::future::pending().await
    }

    async fn health_check(&self) -> StoreResult<()> {
        std::future::pending().await
    }
}

/// Wraps another store and counts read calls.
pub(crate) struct CountingStore<S> {
    inner: S,
    reads: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: ReferenceStore> ReferenceStore for CountingStore<S> {
    async fn put(&self, reference: &FileReference) -> StoreResult<()> {
        self.inner.put(reference).await
    }

    async fn get(&self, code: &AccessCode) -> StoreResult<Option<FileReference>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(code).await
    }

    async fn take(&self, code: &AccessCode) -> StoreResult<Option<FileReference>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.take(code).await
    }

    async fn delete(&self, code: &AccessCode) -> StoreResult<bool> {
        self.inner.delete(code).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        self.inner.purge_expired(now).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}
