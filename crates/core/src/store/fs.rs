//! Filesystem-backed reference store.
//!
//! # Storage Layout
//!
//! Each reference is one JSON record, sharded by the leading digit pairs of its code:
//!
//! ```text
//! <data_dir>/
//! └── 00/
//!     └── 48/
//!         └── 004821.json
//! ```
//!
//! # Atomicity
//!
//! Every operation runs to completion on a blocking thread, so a caller that stops waiting
//! (for example on a timeout) never leaves an operation half done. Mutations of one code are
//! serialised by a lock stripe chosen from the code.
//!
//! - **Insert**: the record is written and synced to a hidden temp file in the shard directory,
//!   then hard-linked to its final name. `link(2)` fails if the name exists, so the link is the
//!   conditional insert and readers never see a partially written record.
//! - **Take**: the record is renamed to a unique hidden name before it is read. The taken file
//!   is only removed once the result has been handed to the caller. If the caller is gone the
//!   record is linked back under its code.
//! - **Replace expired**: runs under the code's lock stripe, so no other insert, take or purge
//!   in this process can interleave with it.
//!
//! Lock stripes are per process. Several processes sharing one data directory keep the insert
//! and take guarantees but may race when replacing the same expired record.
//!
//! Hidden temp and taken files left behind by a crash are cleaned up by [`FsStore::open`].

use super::ReferenceStore;
use crate::code::AccessCode;
use crate::constants::REFERENCE_FILE_EXTENSION;
use crate::error::{StoreError, StoreResult};
use crate::reference::FileReference;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use uuid::Uuid;

const LOCK_STRIPES: usize = 64;
const TEMP_SUFFIX: &str = "tmp";
const TAKEN_SUFFIX: &str = "taken";

#[derive(Debug, Clone)]
pub struct FsStore {
    records: Arc<Records>,
}

#[derive(Debug)]
struct Records {
    data_dir: PathBuf,
    stripes: Vec<Mutex<()>>,
}

impl FsStore {
    /// Opens the store rooted at `data_dir`, creating the directory if needed.
    ///
    /// Leftover temp files are removed and leftover taken records are restored under their
    /// code, unless a newer record already holds it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created or canonicalised, and
    /// [`StoreError::Unavailable`] if the path exists but is not a directory.
    pub async fn open(data_dir: &Path) -> StoreResult<Self> {
        let data_dir = data_dir.to_path_buf();
        let records = tokio::task::spawn_blocking(move || Records::open(&data_dir))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store open task failed: {e}")))??;

        tracing::debug!("opened filesystem store at {}", records.data_dir.display());
        Ok(Self {
            records: Arc::new(records),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.records.data_dir
    }

    /// Runs `op` on a blocking thread and waits for it.
    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Records) -> StoreResult<T> + Send + 'static,
    {
        let records = self.records.clone();
        tokio::task::spawn_blocking(move || op(&records))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }

    /// Runs `op` on a blocking thread, handing it the channel its result must be sent on.
    ///
    /// The operation keeps running if the caller is dropped and can see that from a failed
    /// send.
    async fn acknowledged<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Records, oneshot::Sender<StoreResult<T>>) + Send + 'static,
    {
        let records = self.records.clone();
        let (reply, result) = oneshot::channel();
        tokio::task::spawn_blocking(move || op(&records, reply));
        result
            .await
            .map_err(|_| StoreError::Unavailable("store task ended without a result".into()))?
    }

    /// Holds the lock stripe for `code`, stalling every mutation of it.
    #[cfg(test)]
    pub(crate) fn hold(&self, code: &AccessCode) -> MutexGuard<'_, ()> {
        self.records.lock(code)
    }
}

impl Records {
    fn open(data_dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(data_dir)?;
        let data_dir = fs::canonicalize(data_dir)?;
        if !fs::metadata(&data_dir)?.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "store path is not a directory: {}",
                data_dir.display()
            )));
        }

        let records = Self {
            data_dir,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        };
        records.recover_leftovers()?;
        Ok(records)
    }

    fn lock(&self, code: &AccessCode) -> MutexGuard<'_, ()> {
        let stripe = code.value() as usize % self.stripes.len();
        // The guarded value is `()`, so a poisoned stripe carries no broken state.
        self.stripes[stripe].lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_path(&self, code: &AccessCode) -> PathBuf {
        code.shard_dir(&self.data_dir)
            .join(format!("{code}.{REFERENCE_FILE_EXTENSION}"))
    }

    fn get(&self, code: &AccessCode) -> StoreResult<Option<FileReference>> {
        let record = read_record(&self.record_path(code))?;
        let now = Utc::now();
        Ok(record.filter(|r| !r.is_expired(now)))
    }

    fn put(&self, reference: &FileReference, reply: oneshot::Sender<StoreResult<()>>) {
        let _guard = self.lock(&reference.code);
        let path = self.record_path(&reference.code);

        let outcome = self.insert(&path, reference);
        if let Err(Ok(())) = reply.send(outcome) {
            // Nobody learned the code, so the share could never be claimed.
            tracing::debug!("discarding unacknowledged reference {}", reference.code);
            if let Err(e) = remove_if_present(&path) {
                tracing::warn!("failed to discard record {}: {}", path.display(), e);
            }
        }
    }

    fn insert(&self, path: &Path, reference: &FileReference) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(reference)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match link_new(path, &bytes) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }

        // Caller holds the code's stripe.
        match read_record(path)? {
            Some(existing) if !existing.is_expired(Utc::now()) => {
                return Err(StoreError::DuplicateKey(reference.code));
            }
            Some(existing) => {
                tracing::debug!("replacing expired reference {}", existing.code);
                remove_if_present(path)?;
            }
            None => {}
        }

        match link_new(path, &bytes) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::DuplicateKey(reference.code))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn take(&self, code: &AccessCode, reply: oneshot::Sender<StoreResult<Option<FileReference>>>) {
        let _guard = self.lock(code);
        let path = self.record_path(code);
        let taken = hidden_name(&path, &code.to_string(), TAKEN_SUFFIX);

        match fs::rename(&path, &taken) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let _ = reply.send(Ok(None));
                return;
            }
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        }

        let now = Utc::now();
        let outcome = read_record(&taken).map(|r| r.filter(|r| !r.is_expired(now)));
        if outcome.is_err() {
            restore(&taken, &path);
            let _ = reply.send(outcome);
            return;
        }

        if reply.send(outcome).is_err() {
            tracing::debug!("restoring unclaimed reference {}", code);
            restore(&taken, &path);
        } else if let Err(e) = fs::remove_file(&taken) {
            tracing::warn!("failed to remove taken record {}: {}", taken.display(), e);
        }
    }

    fn delete(&self, code: &AccessCode) -> StoreResult<bool> {
        let _guard = self.lock(code);
        Ok(remove_if_present(&self.record_path(code))?)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut purged = 0;

        for path in self.files()?.into_iter().filter(|p| is_record_file(p)) {
            let record = match read_record(&path) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("skipping unreadable record {}: {}", path.display(), e);
                    continue;
                }
            };
            if !record.is_expired(now) {
                continue;
            }

            // Re-check under the stripe so a concurrent replacement is never removed.
            let _guard = self.lock(&record.code);
            match read_record(&path) {
                Ok(Some(current)) if current.is_expired(now) => {
                    if remove_if_present(&path)? {
                        purged += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("skipping unreadable record {}: {}", path.display(), e);
                }
            }
        }

        Ok(purged)
    }

    fn health_check(&self) -> StoreResult<()> {
        match fs::metadata(&self.data_dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::Unavailable(format!(
                "store path is not a directory: {}",
                self.data_dir.display()
            ))),
            Err(e) => Err(StoreError::Unavailable(format!(
                "store directory {} is not accessible: {}",
                self.data_dir.display(),
                e
            ))),
        }
    }

    /// Removes temp files and restores taken records left behind by an earlier process.
    fn recover_leftovers(&self) -> StoreResult<()> {
        let mut recovered = 0;
        for path in self.files()? {
            let Some(name) = hidden_file_name(&path) else {
                continue;
            };
            let mut parts = name.split('.');
            let (Some(stem), Some(suffix)) = (parts.next(), parts.next_back()) else {
                continue;
            };

            if suffix == TEMP_SUFFIX {
                remove_if_present(&path)?;
                recovered += 1;
            } else if suffix == TAKEN_SUFFIX {
                restore(
                    &path,
                    &path.with_file_name(format!("{stem}.{REFERENCE_FILE_EXTENSION}")),
                );
                recovered += 1;
            }
        }

        if recovered > 0 {
            tracing::info!(recovered, "cleaned up interrupted store operations");
        }
        Ok(())
    }

    /// Collects every regular file under the data directory.
    fn files(&self) -> StoreResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![self.data_dir.clone()];

        while let Some(dir) = pending.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries {
                let entry = entry?;
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }

        Ok(files)
    }
}

/// Reads a record, mapping a missing file to `None`.
fn read_record(path: &Path) -> StoreResult<Option<FileReference>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes `bytes` to a temp file beside `path` and links it into place.
///
/// Fails with `ErrorKind::AlreadyExists` if `path` is taken.
fn link_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = hidden_name(path, "new", TEMP_SUFFIX);

    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    let linked = written.and_then(|()| fs::hard_link(&tmp, path));

    if let Err(e) = remove_if_present(&tmp) {
        tracing::warn!("failed to remove temp record {}: {}", tmp.display(), e);
    }
    linked
}

/// Links `taken` back to `path` and removes it.
///
/// If `path` is already held the newer record wins and the taken one is dropped.
fn restore(taken: &Path, path: &Path) {
    match fs::hard_link(taken, path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::warn!(
                "dropping taken record {}: code was registered again",
                taken.display()
            );
        }
        Err(e) => {
            tracing::error!("failed to restore record {}: {}", taken.display(), e);
            return;
        }
    }
    if let Err(e) = fs::remove_file(taken) {
        tracing::warn!("failed to remove taken record {}: {}", taken.display(), e);
    }
}

/// Removes `path`, treating an already-missing file as success.
fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// `.<stem>.<uuid>.<suffix>` beside `path`.
fn hidden_name(path: &Path, stem: &str, suffix: &str) -> PathBuf {
    path.with_file_name(format!(".{stem}.{}.{suffix}", Uuid::new_v4().simple()))
}

/// The file name without its leading dot, if the file is hidden.
fn hidden_file_name(path: &Path) -> Option<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix('.'))
}

fn is_record_file(path: &Path) -> bool {
    let visible = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with('.'));
    visible
        && path
            .extension()
            .is_some_and(|ext| ext == REFERENCE_FILE_EXTENSION)
}

#[async_trait]
impl ReferenceStore for FsStore {
    async fn put(&self, reference: &FileReference) -> StoreResult<()> {
        let reference = reference.clone();
        self.acknowledged(move |records, reply| records.put(&reference, reply)).await
    }

    async fn get(&self, code: &AccessCode) -> StoreResult<Option<FileReference>> {
        let code = *code;
        self.blocking(move |records| records.get(&code)).await
    }

    async fn take(&self, code: &AccessCode) -> StoreResult<Option<FileReference>> {
        let code = *code;
        self.acknowledged(move |records, reply| records.take(&code, reply)).await
    }

    async fn delete(&self, code: &AccessCode) -> StoreResult<bool> {
        let code = *code;
        self.blocking(move |records| records.delete(&code)).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        self.blocking(move |records| records.purge_expired(now)).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.blocking(Records::health_check).await
    }
}
