//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the services as an
//! `Arc<CoreConfig>`. Nothing in the request path reads environment variables.
//!
//! The `*_from_env_value` helpers take the raw `Option<String>` from `std::env::var(..).ok()` so
//! binaries can do the lookup themselves and tests never touch process-wide state.

use crate::constants::{
    DEFAULT_CODE_DIGITS, DEFAULT_MAX_ATTEMPTS, DEFAULT_STORE_TIMEOUT_MS, MAX_CODE_DIGITS,
};
use crate::error::{ConfigError, ConfigResult};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    code_digits: u8,
    max_attempts: u32,
    burn_on_read: bool,
    ttl: Option<Duration>,
    store_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - `code_digits` is zero or wider than [`MAX_CODE_DIGITS`],
    /// - `max_attempts` is zero,
    /// - `ttl` or `store_timeout` is zero, or `ttl` is too large to add to a timestamp.
    pub fn new(
        code_digits: u8,
        max_attempts: u32,
        burn_on_read: bool,
        ttl: Option<Duration>,
        store_timeout: Duration,
    ) -> ConfigResult<Self> {
        if code_digits == 0 || code_digits > MAX_CODE_DIGITS {
            return Err(ConfigError::CodeDigits {
                max: MAX_CODE_DIGITS,
                got: code_digits,
            });
        }
        if max_attempts == 0 {
            return Err(ConfigError::MaxAttempts);
        }
        if store_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: "store_timeout",
            });
        }
        if let Some(ttl) = ttl {
            if ttl.is_zero() {
                return Err(ConfigError::ZeroDuration { name: "ttl" });
            }
            chrono::Duration::from_std(ttl).map_err(|_| ConfigError::InvalidValue {
                name: "ttl",
                value: format!("{ttl:?}"),
            })?;
        }

        Ok(Self {
            code_digits,
            max_attempts,
            burn_on_read,
            ttl,
            store_timeout,
        })
    }

    pub fn code_digits(&self) -> u8 {
        self.code_digits
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether a successful validation consumes the code.
    pub fn burn_on_read(&self) -> bool {
        self.burn_on_read
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Expiry instant for a reference created at `created_at`, if a TTL is configured.
    pub fn expiry_for(&self, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // `new` already checked the conversion succeeds.
        self.ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| created_at + ttl)
    }
}

impl Default for CoreConfig {
    /// Six-digit reusable codes with no expiry, matching the historical behaviour.
    fn default() -> Self {
        Self {
            code_digits: DEFAULT_CODE_DIGITS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            burn_on_read: false,
            ttl: None,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off` (any case).
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn bool_from_env_value(
    name: &'static str,
    value: Option<String>,
    default: bool,
) -> ConfigResult<bool> {
    let Some(value) = non_empty(value) else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}

/// Parse an unsigned integer, falling back to `default` when unset or empty.
pub fn number_from_env_value<T>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> ConfigResult<T>
where
    T: std::str::FromStr,
{
    match non_empty(value) {
        None => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}

/// Parse an optional duration given in whole seconds. Unset or empty means "no duration".
pub fn optional_secs_from_env_value(
    name: &'static str,
    value: Option<String>,
) -> ConfigResult<Option<Duration>> {
    non_empty(value)
        .map(|value| {
            value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidValue { name, value })
        })
        .transpose()
}

/// Environment variable names read by the binaries.
pub mod env {
    pub const CODE_DIGITS: &str = "HANDOFF_CODE_DIGITS";
    pub const MAX_ATTEMPTS: &str = "HANDOFF_MAX_ATTEMPTS";
    pub const BURN_ON_READ: &str = "HANDOFF_BURN_ON_READ";
    pub const TTL_SECS: &str = "HANDOFF_TTL_SECS";
    pub const STORE_TIMEOUT_MS: &str = "HANDOFF_STORE_TIMEOUT_MS";
    pub const DATA_DIR: &str = "HANDOFF_DATA_DIR";
    pub const STORE: &str = "HANDOFF_STORE";
    pub const REST_ADDR: &str = "HANDOFF_REST_ADDR";
    pub const SWEEP_INTERVAL_SECS: &str = "HANDOFF_SWEEP_INTERVAL_SECS";
}

/// Build a [`CoreConfig`] from a variable lookup, typically `|k| std::env::var(k).ok()`.
///
/// Unset variables take the defaults of [`CoreConfig::default`].
pub fn core_config_from_lookup<F>(lookup: F) -> ConfigResult<CoreConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let code_digits =
        number_from_env_value(env::CODE_DIGITS, lookup(env::CODE_DIGITS), DEFAULT_CODE_DIGITS)?;
    let max_attempts = number_from_env_value(
        env::MAX_ATTEMPTS,
        lookup(env::MAX_ATTEMPTS),
        DEFAULT_MAX_ATTEMPTS,
    )?;
    let burn_on_read = bool_from_env_value(env::BURN_ON_READ, lookup(env::BURN_ON_READ), false)?;
    let ttl = optional_secs_from_env_value(env::TTL_SECS, lookup(env::TTL_SECS))?;
    let store_timeout_ms = number_from_env_value(
        env::STORE_TIMEOUT_MS,
        lookup(env::STORE_TIMEOUT_MS),
        DEFAULT_STORE_TIMEOUT_MS,
    )?;

    CoreConfig::new(
        code_digits,
        max_attempts,
        burn_on_read,
        ttl,
        Duration::from_millis(store_timeout_ms),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_historical_behaviour() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.code_digits(), 6);
        assert_eq!(cfg.max_attempts(), 5);
        assert!(!cfg.burn_on_read());
        assert!(cfg.ttl().is_none());
        assert!(cfg.expiry_for(Utc::now()).is_none());
    }

    #[test]
    fn new_rejects_out_of_range_values() {
        let timeout = Duration::from_secs(1);
        assert!(matches!(
            CoreConfig::new(0, 5, false, None, timeout),
            Err(ConfigError::CodeDigits { got: 0, .. })
        ));
        assert!(matches!(
            CoreConfig::new(10, 5, false, None, timeout),
            Err(ConfigError::CodeDigits { got: 10, .. })
        ));
        assert!(matches!(
            CoreConfig::new(6, 0, false, None, timeout),
            Err(ConfigError::MaxAttempts)
        ));
        assert!(matches!(
            CoreConfig::new(6, 5, false, Some(Duration::ZERO), timeout),
            Err(ConfigError::ZeroDuration { name: "ttl" })
        ));
        assert!(matches!(
            CoreConfig::new(6, 5, false, None, Duration::ZERO),
            Err(ConfigError::ZeroDuration {
                name: "store_timeout"
            })
        ));
    }

    #[test]
    fn expiry_is_created_at_plus_ttl() {
        let cfg =
            CoreConfig::new(6, 5, false, Some(Duration::from_secs(90)), Duration::from_secs(1))
                .unwrap();
        let created = Utc::now();
        assert_eq!(
            cfg.expiry_for(created),
            Some(created + chrono::Duration::seconds(90))
        );
    }

    #[test]
    fn bool_values_parse_leniently() {
        assert!(bool_from_env_value("X", Some("Yes".into()), false).unwrap());
        assert!(!bool_from_env_value("X", Some("0".into()), true).unwrap());
        assert!(bool_from_env_value("X", Some("  ".into()), true).unwrap());
        assert!(bool_from_env_value("X", Some("maybe".into()), false).is_err());
    }

    #[test]
    fn numbers_and_durations_parse() {
        assert_eq!(number_from_env_value("X", None, 6u8).unwrap(), 6);
        assert_eq!(number_from_env_value("X", Some(" 8 ".into()), 6u8).unwrap(), 8);
        assert!(number_from_env_value("X", Some("eight".into()), 6u8).is_err());

        assert_eq!(optional_secs_from_env_value("X", None).unwrap(), None);
        assert_eq!(
            optional_secs_from_env_value("X", Some("30".into())).unwrap(),
            Some(Duration::from_secs(30))
        );
        assert!(optional_secs_from_env_value("X", Some("-1".into())).is_err());
    }

    #[test]
    fn lookup_builds_config_with_defaults_and_overrides() {
        let vars: std::collections::HashMap<&str, &str> = [
            (env::CODE_DIGITS, "8"),
            (env::BURN_ON_READ, "true"),
            (env::TTL_SECS, "3600"),
        ]
        .into_iter()
        .collect();
        let cfg = core_config_from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.code_digits(), 8);
        assert_eq!(cfg.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert!(cfg.burn_on_read());
        assert_eq!(cfg.ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(
            cfg.store_timeout(),
            Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS)
        );

        let err = core_config_from_lookup(|k| (k == env::CODE_DIGITS).then(|| "12".to_string()));
        assert!(matches!(err, Err(ConfigError::CodeDigits { got: 12, .. })));
    }
}
