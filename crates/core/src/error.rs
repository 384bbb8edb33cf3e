use crate::code::AccessCode;
use std::time::Duration;

/// Failures raised by a [`ReferenceStore`](crate::store::ReferenceStore) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("access code {0} is already held by a live reference")]
    DuplicateKey(AccessCode),
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialise reference record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Why a submitted code string is not a well-formed access code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeFormatError {
    #[error("code has {actual} characters, expected {expected}")]
    TooShort { expected: u8, actual: usize },
    #[error("code has {actual} characters, expected {expected}")]
    TooLong { expected: u8, actual: usize },
    #[error("code must contain only the digits 0-9")]
    NonDigit,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no unused access code found after {attempts} attempts")]
    RegistrationFailed { attempts: u32 },
    #[error("store unavailable during registration: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl RegistrationError {
    /// Short, non-technical text suitable for showing to the uploader.
    pub fn user_message(&self) -> String {
        match self {
            RegistrationError::InvalidInput(reason) => format!("Invalid upload: {reason}"),
            RegistrationError::RegistrationFailed { .. } => {
                "Failed to create a share code, please upload the file again".into()
            }
            RegistrationError::StoreUnavailable(_) => {
                "Failed to upload file, please try again later".into()
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed access code: {0}")]
    InvalidFormat(#[from] CodeFormatError),
    #[error("no file is registered under this code")]
    NotFound,
    #[error("store unavailable during validation: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl ValidationError {
    /// Short, non-technical text suitable for showing to the downloader.
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::InvalidFormat(CodeFormatError::TooShort { expected, .. }) => {
                format!("Code should be {expected} digits")
            }
            ValidationError::InvalidFormat(CodeFormatError::TooLong { expected, .. }) => {
                format!("Code should not exceed {expected} digits")
            }
            ValidationError::InvalidFormat(CodeFormatError::NonDigit) => {
                "Only numbers allowed".into()
            }
            ValidationError::NotFound => "Invalid code, no file found".into(),
            ValidationError::StoreUnavailable(_) => {
                "Service temporarily unavailable, please try again".into()
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("code_digits must be between 1 and {max}, got {got}")]
    CodeDigits { max: u8, got: u8 },
    #[error("max_attempts must be at least 1")]
    MaxAttempts,
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
