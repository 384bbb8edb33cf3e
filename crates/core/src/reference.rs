//! The persisted record binding an access code to an uploaded blob.

use crate::code::AccessCode;
use chrono::{DateTime, Utc};

/// One registered share.
///
/// The broker never sees file bytes. `location_pointer` is whatever the external object store
/// handed the uploader (usually a download URL) and is returned verbatim to the downloader.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileReference {
    /// Lookup key.
    pub code: AccessCode,

    /// Opaque pointer to the blob in external storage.
    pub location_pointer: String,

    /// Original file name, used when the downloader saves the blob.
    pub display_name: String,

    /// UTC timestamp when the reference was committed.
    pub created_at: DateTime<Utc>,

    /// When set, the reference is treated as absent from this instant on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl FileReference {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Trims `input` and checks it is non-empty, at most `max_len` bytes and free of control
/// characters.
pub(crate) fn clean_text(field: &str, input: &str, max_len: usize) -> Result<String, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    if trimmed.len() > max_len {
        return Err(format!("{field} exceeds {max_len} bytes"));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(format!("{field} contains control characters"));
    }
    Ok(trimmed.to_owned())
}
