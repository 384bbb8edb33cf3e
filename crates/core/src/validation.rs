//! Validation: resolving a submitted access code to its file reference.

use crate::code::AccessCode;
use crate::config::CoreConfig;
use crate::error::{StoreError, ValidationError};
use crate::reference::FileReference;
use crate::store::ReferenceStore;
use std::sync::Arc;

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Looks up file references by submitted code.
///
/// Read-only unless [`CoreConfig::burn_on_read`] is set, in which case a successful lookup
/// consumes the code through [`ReferenceStore::take`].
#[derive(Clone)]
pub struct ValidationService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ReferenceStore>,
}

impl ValidationService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn ReferenceStore>) -> Self {
        Self { cfg, store }
    }

    /// Returns the reference registered under `submitted_code`.
    ///
    /// The format is checked before the store is consulted.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidFormat`] if the input is not exactly `code_digits` digits.
    /// - [`ValidationError::NotFound`] if no live reference holds the code.
    /// - [`ValidationError::StoreUnavailable`] if the store failed or timed out. This says
    ///   nothing about whether the code exists.
    pub async fn validate(&self, submitted_code: &str) -> ValidationResult<FileReference> {
        let code = AccessCode::parse(submitted_code, self.cfg.code_digits())?;

        match self.lookup(&code).await {
            Ok(Some(reference)) => {
                if self.cfg.burn_on_read() {
                    tracing::info!("burned access code for {}", reference.display_name);
                }
                Ok(reference)
            }
            Ok(None) => {
                tracing::debug!(%code, "no reference for submitted code");
                Err(ValidationError::NotFound)
            }
            Err(e) => {
                tracing::error!("store failure during validation: {}", e);
                Err(ValidationError::StoreUnavailable(e))
            }
        }
    }

    async fn lookup(&self, code: &AccessCode) -> Result<Option<FileReference>, StoreError> {
        let timeout = self.cfg.store_timeout();
        let lookup = async {
            if self.cfg.burn_on_read() {
                self.store.take(code).await
            } else {
                self.store.get(code).await
            }
        };
        tokio::time::timeout(timeout, lookup)
            .await
            .map_err(|_| StoreError::Timeout(timeout))?
    }
}
