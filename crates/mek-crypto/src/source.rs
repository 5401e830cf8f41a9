//! Key provenance tags and derivation contexts.

use std::{fmt, str::FromStr};

/// Which credential type produced a key.
///
/// The string forms are the tags stored in the public-key directory and must
/// not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySource {
    /// Wallet (externally owned account) signature
    Eoa,
    /// Passkey pseudo-random-function output
    PasskeyPrf,
    /// Passkey without PRF support; device-local randomness
    PasskeyFallback,
    /// User PIN stretched with PBKDF2
    Pin,
    /// Key produced before derivation was versioned
    Legacy,
}

impl KeySource {
    /// Directory tag for this source.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eoa => "eoa",
            Self::PasskeyPrf => "passkey-prf",
            Self::PasskeyFallback => "passkey-fallback",
            Self::Pin => "pin",
            Self::Legacy => "legacy",
        }
    }

    /// Whether another device holding the same credential derives the same
    /// key.
    pub fn is_portable(self) -> bool {
        !matches!(self, Self::PasskeyFallback)
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized directory tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key source tag: {0:?}")]
pub struct UnknownKeySource(pub String);

impl FromStr for KeySource {
    type Err = UnknownKeySource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eoa" => Ok(Self::Eoa),
            "passkey-prf" => Ok(Self::PasskeyPrf),
            "passkey-fallback" => Ok(Self::PasskeyFallback),
            "pin" => Ok(Self::Pin),
            "legacy" => Ok(Self::Legacy),
            other => Err(UnknownKeySource(other.to_string())),
        }
    }
}

/// Purpose label fed into HKDF `info`.
///
/// One per credential path. `Legacy` has no context: legacy keys are never
/// derived by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedContext {
    /// Wallet signature path
    Eoa,
    /// Passkey PRF path
    PasskeyPrf,
    /// Passkey fallback path
    PasskeyFallback,
    /// PIN path
    Pin,
}

impl SeedContext {
    /// Purpose prefix of the HKDF `info` string.
    pub fn purpose(self) -> &'static str {
        match self {
            Self::Eoa => "mek-eoa",
            Self::PasskeyPrf => "mek-passkey-prf",
            Self::PasskeyFallback => "mek-passkey-fallback",
            Self::Pin => "mek-pin",
        }
    }
}

impl From<SeedContext> for KeySource {
    fn from(context: SeedContext) -> Self {
        match context {
            SeedContext::Eoa => Self::Eoa,
            SeedContext::PasskeyPrf => Self::PasskeyPrf,
            SeedContext::PasskeyFallback => Self::PasskeyFallback,
            SeedContext::Pin => Self::Pin,
        }
    }
}
