//! Error types for key acquisition.
//!
//! Three layers, innermost first:
//!
//! - [`CapabilityError`]: what a wallet or authenticator reports
//! - [`AdapterError`]: what one credential adapter reports
//! - [`DeriveFailure`]: the caller-facing tagged failure of a key request
//!
//! [`DirectoryError`] covers the public-key directory and never reaches the
//! caller from a publish.

use mek_crypto::{CryptoError, IdentityError, KeySource, PinValidationError};
use thiserror::Error;

use crate::request::AuthType;

/// Failure reported by an external signing or authenticator capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// User dismissed or rejected the prompt
    #[error("user cancelled the prompt")]
    Cancelled,

    /// Capability is not present (no wallet connected, no authenticator)
    #[error("capability unavailable: {reason}")]
    Unavailable {
        /// Human-readable detail from the capability
        reason: String,
    },
}

/// Failure of a single credential adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// User cancelled the signing or authenticator prompt
    #[error("user cancelled")]
    Cancelled,

    /// Capability absent for this path
    #[error("capability unavailable: {reason}")]
    Unavailable {
        /// Why the capability could not be used
        reason: String,
    },

    /// Authenticator does not implement the PRF extension
    #[error("authenticator does not support the PRF extension")]
    PrfNotSupported,

    /// PIN failed format validation
    #[error("invalid PIN: {0}")]
    InvalidPin(#[from] PinValidationError),

    /// PIN is well-formed but does not match the established key
    #[error("wrong PIN")]
    WrongPin,

    /// No local record and no published key to check a PIN against
    #[error("no PIN has been established for this identity")]
    PinNotEstablished,

    /// Derivation primitive rejected its input
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl AdapterError {
    /// Returns true if the user can simply retry the same prompt.
    pub fn is_user_cancellable(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<CapabilityError> for AdapterError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Cancelled => Self::Cancelled,
            CapabilityError::Unavailable { reason } => Self::Unavailable { reason },
        }
    }
}

/// Failure talking to the public-key directory.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Directory could not be reached
    #[error("directory unreachable: {reason}")]
    Unreachable {
        /// Transport-level detail
        reason: String,
    },

    /// Directory refused the request
    #[error("directory rejected request: {reason}")]
    Rejected {
        /// Reason given by the directory
        reason: String,
    },
}

impl DirectoryError {
    /// Returns true if the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Coarse class of a [`DeriveFailure`], for routing UI behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Prompt dismissed; retry as-is
    UserCancellable,
    /// Route to another credential type or prompt for setup
    CapabilityAbsent,
    /// Bad or wrong input; re-prompt
    Validation,
    /// Source arbitration refused to guess
    SourceConflict,
    /// Bug or broken primitive
    Internal,
}

/// Caller-facing failure of a key request.
///
/// None of these ever comes with a key: a request either yields the key the
/// identity is established with, or fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeriveFailure {
    /// User dismissed the prompt
    #[error("cancelled by user")]
    Cancelled,

    /// Passkey route chosen but no passkey is available on this device
    #[error("passkey setup required")]
    RequiresPasskeySetup,

    /// Authenticator lacks PRF; caller may explicitly request the fallback
    #[error("PRF unsupported; passkey fallback must be requested explicitly")]
    PrfUnsupportedUseFallback,

    /// PIN failed format validation
    #[error("invalid PIN: {0}")]
    InvalidPin(PinValidationError),

    /// PIN does not match the established key
    #[error("wrong PIN")]
    WrongPin,

    /// Required capability missing
    #[error("capability unavailable: {reason}")]
    UnavailableCapability {
        /// Why the capability could not be used
        reason: String,
    },

    /// PIN route chosen but no PIN supplied
    #[error("PIN required")]
    PinRequired,

    /// PIN rotation requested for an identity with no PIN established
    #[error("no PIN established for this identity")]
    NoPinEstablished,

    /// Established source does not allow the requested credential type
    #[error("key source conflict: established {established}, requested {requested:?}")]
    SourceConflict {
        /// Source the identity is established with
        established: KeySource,
        /// Credential type the caller asked for
        requested: AuthType,
    },

    /// Could not read the directory and the route depends on it
    #[error("public-key directory unavailable: {reason}")]
    DirectoryUnavailable {
        /// Underlying directory error
        reason: String,
    },

    /// Identity could not be parsed
    #[error("invalid identity: {0}")]
    InvalidIdentity(#[from] IdentityError),

    /// Unexpected internal failure
    #[error("internal error: {reason}")]
    Internal {
        /// What went wrong
        reason: String,
    },
}

impl DeriveFailure {
    /// Classify this failure.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Cancelled => ErrorClass::UserCancellable,
            Self::RequiresPasskeySetup
            | Self::PrfUnsupportedUseFallback
            | Self::UnavailableCapability { .. }
            | Self::DirectoryUnavailable { .. } => ErrorClass::CapabilityAbsent,
            Self::InvalidPin(_)
            | Self::WrongPin
            | Self::PinRequired
            | Self::NoPinEstablished
            | Self::InvalidIdentity(_) => ErrorClass::Validation,
            Self::SourceConflict { .. } => ErrorClass::SourceConflict,
            Self::Internal { .. } => ErrorClass::Internal,
        }
    }
}

impl From<AdapterError> for DeriveFailure {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Cancelled => Self::Cancelled,
            AdapterError::Unavailable { reason } => Self::UnavailableCapability { reason },
            AdapterError::PrfNotSupported => Self::PrfUnsupportedUseFallback,
            AdapterError::InvalidPin(e) => Self::InvalidPin(e),
            AdapterError::WrongPin => Self::WrongPin,
            AdapterError::PinNotEstablished => Self::NoPinEstablished,
            AdapterError::Crypto(e) => Self::Internal { reason: e.to_string() },
        }
    }
}
