//! # API Shared
//!
//! Shared request/response definitions for the handoff APIs.
//!
//! Contains:
//! - Wire types for the register and validate operations (`types` module)
//! - The shared `HealthService`
//!
//! Field names follow the web client: requests accept both the descriptive names
//! (`locationPointer`, `displayName`, `submittedCode`) and the client's historical ones
//! (`fileData`, `fileName`, `enteredCode`).

pub mod health;
pub mod types;

pub use health::HealthService;
pub use types::*;
