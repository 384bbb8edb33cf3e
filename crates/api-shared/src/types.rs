//! Request and response bodies for the register and validate operations.
//!
//! Every response carries an `error` flag. Failures carry a short human-readable `message` and
//! never any infrastructure detail.

use handoff_core::{AccessCode, FileReference, RegistrationError, ValidationError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Register an uploaded blob and receive an access code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReq {
    /// Pointer returned by the object store, usually a download URL.
    #[serde(alias = "fileData")]
    pub location_pointer: String,
    /// Original file name.
    #[serde(alias = "fileName")]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegisterRes {
    pub error: bool,
    /// Zero-padded access code, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RegisterRes {
    pub fn registered(code: &AccessCode) -> Self {
        Self {
            error: false,
            code: Some(code.to_string()),
            message: None,
        }
    }

    pub fn failed(err: &RegistrationError) -> Self {
        Self {
            error: true,
            code: None,
            message: Some(err.user_message()),
        }
    }
}

/// Look up the file registered under a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReq {
    #[serde(alias = "enteredCode")]
    pub submitted_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileRes {
    /// Location pointer to fetch the bytes from.
    pub url: String,
    /// Name to save the download under.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidateRes {
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidateRes {
    pub fn found(reference: &FileReference) -> Self {
        Self {
            error: false,
            file: Some(FileRes {
                url: reference.location_pointer.clone(),
                name: reference.display_name.clone(),
            }),
            message: None,
        }
    }

    pub fn failed(err: &ValidationError) -> Self {
        Self {
            error: true,
            file: None,
            message: Some(err.user_message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}
