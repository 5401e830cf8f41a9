//! Account identity normalization.

use std::{fmt, str::FromStr};

use crate::error::IdentityError;

/// Case-insensitive account identifier (e.g. an EVM address).
///
/// Always stored lowercased. Every derivation input built from an identity
/// goes through this type, so two devices that receive `0xABC…` and `0xabc…`
/// derive the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Parse and normalize an identity.
    ///
    /// Rejects empty input and input containing whitespace rather than
    /// trimming it, since trimming is not part of the derivation contract.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        if raw.is_empty() {
            return Err(IdentityError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(IdentityError::Whitespace);
        }
        Ok(Self(raw.to_lowercase()))
    }

    /// Normalized (lowercase) form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
