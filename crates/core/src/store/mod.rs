//! Durable mapping from access code to [`FileReference`].
//!
//! The store is the only shared mutable resource in the broker. Every implementation must make
//! [`ReferenceStore::put`] a conditional insert: two concurrent puts of the same code resolve to
//! exactly one winner and the loser sees [`StoreError::DuplicateKey`]. A put followed by a get of
//! the same code must observe the insert immediately.
//!
//! Expired references (see [`FileReference::is_expired`]) are invisible to `get` and `take` and
//! may be replaced by `put`.
//!
//! [`StoreError::DuplicateKey`]: crate::error::StoreError::DuplicateKey

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::code::AccessCode;
use crate::error::StoreResult;
use crate::reference::FileReference;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Inserts `reference` under its code unless a live reference already holds it.
    async fn put(&self, reference: &FileReference) -> StoreResult<()>;

    /// Returns the live reference for `code`, if any.
    async fn get(&self, code: &AccessCode) -> StoreResult<Option<FileReference>>;

    /// Atomically returns and removes the live reference for `code`.
    ///
    /// Of several concurrent takes of the same code, at most one receives the reference.
    async fn take(&self, code: &AccessCode) -> StoreResult<Option<FileReference>>;

    /// Removes the mapping for `code`. Returns whether one was present.
    async fn delete(&self, code: &AccessCode) -> StoreResult<bool>;

    /// Removes every reference whose expiry is at or before `now`. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Checks the backing storage is reachable.
    async fn health_check(&self) -> StoreResult<()>;
}
