//! Error types for MEK primitives

use thiserror::Error;

/// Errors from the deterministic derivation primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Secret material was empty; nothing to derive from
    #[error("secret material is empty")]
    EmptySecret,

    /// PBKDF2 was asked to run zero rounds
    #[error("PIN stretching requires at least one iteration")]
    InvalidIterations,

    /// Relying party id could not be normalized
    #[error("invalid relying party id: {input:?}")]
    InvalidRelyingPartyId {
        /// The rejected input
        input: String,
    },
}

/// Errors from parsing an account identity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Identity was empty
    #[error("identity is empty")]
    Empty,

    /// Identity contains whitespace, which would silently change the
    /// derivation input
    #[error("identity contains whitespace")]
    Whitespace,
}

/// PIN format violations. Detected before any cryptographic work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PinValidationError {
    /// PIN has fewer digits than required
    #[error("PIN too short: need at least {min} digits, got {actual}")]
    TooShort {
        /// Minimum accepted length
        min: usize,
        /// Length of the rejected PIN
        actual: usize,
    },

    /// PIN contains something other than ASCII digits
    #[error("PIN must contain digits only")]
    NonNumeric,
}
