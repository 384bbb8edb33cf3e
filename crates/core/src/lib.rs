//! # Handoff Core
//!
//! Core logic of the code-based file-handoff broker.
//!
//! An uploader puts a file into external object storage, then registers the resulting location
//! pointer here and receives a short numeric access code. A downloader submits the code and gets
//! the pointer and original file name back. The broker never handles file bytes.
//!
//! This crate contains:
//! - Access codes and their generation ([`code`])
//! - The reference store trait with in-memory and filesystem implementations ([`store`])
//! - Registration with bounded collision retry ([`registration`])
//! - Validation with optional one-time codes ([`validation`])
//! - Startup configuration ([`config`]) and the expiry sweeper ([`sweeper`])
//!
//! **No API concerns**: HTTP servers, request/response shapes and CLI parsing belong in
//! `api-rest`, `api-shared` and `handoff-cli`.

pub mod code;
pub mod config;
pub mod constants;
pub mod error;
pub mod reference;
pub mod registration;
pub mod store;
pub mod sweeper;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use code::{AccessCode, CodeGenerator, RandomCodeGenerator};
pub use config::CoreConfig;
pub use constants::DEFAULT_DATA_DIR;
pub use error::{
    CodeFormatError, ConfigError, RegistrationError, StoreError, StoreResult, ValidationError,
};
pub use reference::FileReference;
pub use registration::RegistrationService;
pub use store::{FsStore, MemoryStore, ReferenceStore};
pub use validation::ValidationService;
