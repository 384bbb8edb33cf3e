//! Registration: binding an uploaded blob to a fresh access code.

use crate::code::{AccessCode, CodeGenerator};
use crate::config::CoreConfig;
use crate::constants::{MAX_DISPLAY_NAME_LEN, MAX_LOCATION_POINTER_LEN};
use crate::error::{RegistrationError, StoreError};
use crate::reference::{clean_text, FileReference};
use crate::store::ReferenceStore;
use chrono::Utc;
use std::sync::Arc;

pub type RegistrationResult<T> = std::result::Result<T, RegistrationError>;

/// Registers file references under newly drawn access codes.
///
/// Collisions are resolved here, not in the generator: a candidate that the store rejects with
/// [`StoreError::DuplicateKey`] is discarded and a new one drawn, up to
/// [`CoreConfig::max_attempts`] candidates in total.
#[derive(Clone)]
pub struct RegistrationService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ReferenceStore>,
    generator: Arc<dyn CodeGenerator>,
}

impl RegistrationService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn ReferenceStore>,
        generator: Arc<dyn CodeGenerator>,
    ) -> Self {
        Self {
            cfg,
            store,
            generator,
        }
    }

    /// Persists a reference to `location_pointer` and returns the code it was stored under.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::InvalidInput`] if either argument is empty, too long or contains
    ///   control characters. Nothing is written.
    /// - [`RegistrationError::RegistrationFailed`] if every candidate code collided.
    /// - [`RegistrationError::StoreUnavailable`] if the store failed or timed out. The caller
    ///   cannot assume the reference was not written.
    pub async fn register(
        &self,
        location_pointer: &str,
        display_name: &str,
    ) -> RegistrationResult<AccessCode> {
        let location_pointer =
            clean_text("location pointer", location_pointer, MAX_LOCATION_POINTER_LEN)
                .map_err(RegistrationError::InvalidInput)?;
        let display_name = clean_text("display name", display_name, MAX_DISPLAY_NAME_LEN)
            .map_err(RegistrationError::InvalidInput)?;

        let attempts = self.cfg.max_attempts();
        for attempt in 1..=attempts {
            let code = self.generator.generate();
            let created_at = Utc::now();
            let reference = FileReference {
                code,
                location_pointer: location_pointer.clone(),
                display_name: display_name.clone(),
                created_at,
                expires_at: self.cfg.expiry_for(created_at),
            };

            match self.put_with_timeout(&reference).await {
                Ok(()) => {
                    tracing::info!(attempt, "registered share for {}", reference.display_name);
                    tracing::debug!(%code, "registered access code");
                    return Ok(code);
                }
                Err(StoreError::DuplicateKey(_)) => {
                    tracing::warn!(attempt, attempts, "access code collision, drawing again");
                }
                Err(e) => {
                    tracing::error!("store failure during registration: {}", e);
                    return Err(RegistrationError::StoreUnavailable(e));
                }
            }
        }

        tracing::error!(attempts, "registration gave up after repeated code collisions");
        Err(RegistrationError::RegistrationFailed { attempts })
    }

    async fn put_with_timeout(&self, reference: &FileReference) -> Result<(), StoreError> {
        let timeout = self.cfg.store_timeout();
        tokio::time::timeout(timeout, self.store.put(reference))
            .await
            .map_err(|_| StoreError::Timeout(timeout))?
    }
}
