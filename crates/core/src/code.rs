//! Access codes and their generation.
//!
//! An access code is a short decimal number rendered at a fixed width. Codes are zero-padded at
//! generation time: an [`AccessCode`] always carries its width, so `4821` at six digits is
//! `004821` everywhere it is displayed, stored or compared.
//!
//! Generators only draw candidates. They never consult the store; uniqueness is enforced by
//! the store's conditional insert and the registration retry loop.

use crate::error::CodeFormatError;
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};

/// A fixed-width decimal access code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccessCode {
    value: u32,
    digits: u8,
}

impl AccessCode {
    /// Builds a code from its numeric value and width.
    ///
    /// Returns `None` if `digits` is outside `1..=9` or `value` does not fit in `digits`.
    pub fn new(value: u32, digits: u8) -> Option<Self> {
        let upper = Self::cardinality(digits)?;
        (value < upper).then_some(Self { value, digits })
    }

    /// Number of distinct codes of the given width, or `None` for unsupported widths.
    pub fn cardinality(digits: u8) -> Option<u32> {
        if digits == 0 || digits > crate::constants::MAX_CODE_DIGITS {
            return None;
        }
        Some(10u32.pow(u32::from(digits)))
    }

    /// Validates a submitted code string against the configured width.
    ///
    /// The input must be exactly `digits` ASCII digits. Length is checked before content so a
    /// caller can tell "wrong length" apart from "wrong characters".
    ///
    /// # Errors
    ///
    /// Returns [`CodeFormatError`] describing the first problem found.
    pub fn parse(input: &str, digits: u8) -> Result<Self, CodeFormatError> {
        let actual = input.chars().count();
        let expected = usize::from(digits);
        if actual < expected {
            return Err(CodeFormatError::TooShort {
                expected: digits,
                actual,
            });
        }
        if actual > expected {
            return Err(CodeFormatError::TooLong {
                expected: digits,
                actual,
            });
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodeFormatError::NonDigit);
        }

        let value = input
            .parse::<u32>()
            .map_err(|_| CodeFormatError::NonDigit)?;
        Self::new(value, digits).ok_or(CodeFormatError::TooLong {
            expected: digits,
            actual,
        })
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn digits(&self) -> u8 {
        self.digits
    }

    /// Returns `parent_dir/<c[0..2]>/<c[2..4]>/` for codes of four or more digits.
    ///
    /// Shorter codes live directly under `parent_dir`; there are at most a thousand of them.
    pub fn shard_dir(&self, parent_dir: &Path) -> PathBuf {
        let rendered = self.to_string();
        if rendered.len() < 4 {
            return parent_dir.to_path_buf();
        }
        parent_dir.join(&rendered[0..2]).join(&rendered[2..4])
    }
}

impl fmt::Display for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.value, width = usize::from(self.digits))
    }
}

impl serde::Serialize for AccessCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for AccessCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let digits = u8::try_from(s.len()).map_err(serde::de::Error::custom)?;
        AccessCode::parse(&s, digits).map_err(serde::de::Error::custom)
    }
}

/// Source of candidate access codes.
pub trait CodeGenerator: Send + Sync {
    /// Draws one candidate. Must be fast and side-effect free.
    fn generate(&self) -> AccessCode;
}

/// Draws codes uniformly from `0..10^digits` using the thread-local RNG.
#[derive(Clone, Debug)]
pub struct RandomCodeGenerator {
    digits: u8,
    upper: u32,
}

impl RandomCodeGenerator {
    /// Returns `None` if `digits` is outside `1..=9`.
    pub fn new(digits: u8) -> Option<Self> {
        let upper = AccessCode::cardinality(digits)?;
        Some(Self { digits, upper })
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> AccessCode {
        let value = rand::thread_rng().gen_range(0..self.upper);
        AccessCode {
            value,
            digits: self.digits,
        }
    }
}
