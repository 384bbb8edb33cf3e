//! Constants used throughout the handoff core crate.
//!
//! Defaults for runtime configuration and the on-disk layout of the filesystem store live here
//! so the services, binaries and tests agree on them.

/// Default width of an access code, in decimal digits.
pub const DEFAULT_CODE_DIGITS: u8 = 6;

/// Widest code supported. `10^9 - 1` still fits in a `u32`.
pub const MAX_CODE_DIGITS: u8 = 9;

/// Default number of candidate codes tried before registration gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default per-call timeout for store operations, in milliseconds.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;

/// Default period of the expiry sweeper, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default directory for the filesystem store when none is configured.
pub const DEFAULT_DATA_DIR: &str = "handoff_data";

/// File extension for persisted reference records.
pub const REFERENCE_FILE_EXTENSION: &str = "json";

/// Upper bound on the length of a location pointer, in bytes.
pub const MAX_LOCATION_POINTER_LEN: usize = 4_096;

/// Upper bound on the length of a display name, in bytes.
pub const MAX_DISPLAY_NAME_LEN: usize = 255;
