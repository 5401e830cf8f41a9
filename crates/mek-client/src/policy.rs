//! Source arbitration.
//!
//! Decides, before any adapter runs, which credential paths may produce the
//! key for an identity. An identity established as PIN is always routed to
//! the PIN adapter, whatever other credentials the request carries; any
//! other ordering lets two devices derive different keys for one identity.
//!
//! The caller's hint is the weakest evidence: it only decides the route when
//! neither the cache nor a readable directory row knows the source, and it
//! never outranks them.
//!
//! ```text
//!   cache ─┐
//!   remote ├─► SourceEvidence::resolve ─► EstablishedState
//!   hint  ─┘                                    │
//!                         AuthType, capabilities ┤
//!                                                ▼
//!                                  SourcePolicy::decide ─► [Candidate] | DeriveFailure
//! ```

use mek_crypto::KeySource;

use crate::{error::DeriveFailure, request::AuthType};

/// What is known about an identity's key before deriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstablishedState {
    /// No key published or cached
    NoKeyEstablished,
    /// Established from a PIN
    EstablishedAsPin,
    /// Established from a wallet signature or passkey
    EstablishedAsWalletOrPasskey(KeySource),
    /// Published by a pre-versioned client; provenance unknown
    UnverifiedLegacy,
    /// Two pieces of evidence name different sources
    Disputed {
        /// Source the cache or directory holds
        established: KeySource,
        /// Source that contradicts it
        claimed: KeySource,
    },
}

impl EstablishedState {
    fn from_source(source: KeySource) -> Self {
        match source {
            KeySource::Pin => Self::EstablishedAsPin,
            KeySource::Legacy => Self::UnverifiedLegacy,
            other => Self::EstablishedAsWalletOrPasskey(other),
        }
    }
}

/// Sources reported for an identity by each place that can know it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceEvidence {
    /// Provenance of the session cache entry
    pub cached: Option<KeySource>,
    /// `key_source` of the published directory row
    pub remote: Option<KeySource>,
    /// Caller-supplied hint
    pub hint: Option<KeySource>,
}

impl SourceEvidence {
    /// Combine the evidence.
    ///
    /// A PIN cache entry or row wins. Otherwise the cache and row must agree,
    /// and a hint must agree with whichever of them is known; legacy
    /// provenance cannot be confirmed by a hint. A hint alone decides only
    /// when nothing else is known.
    pub fn resolve(&self) -> EstablishedState {
        use EstablishedState::{Disputed, NoKeyEstablished, UnverifiedLegacy};

        if self.cached == Some(KeySource::Pin) || self.remote == Some(KeySource::Pin) {
            return EstablishedState::EstablishedAsPin;
        }

        let known = match (self.cached, self.remote) {
            (Some(cached), Some(remote)) if cached != remote => {
                return Disputed { established: remote, claimed: cached };
            },
            (Some(source), _) | (None, Some(source)) => Some(source),
            (None, None) => None,
        };

        match (known, self.hint) {
            (Some(KeySource::Legacy), _) => UnverifiedLegacy,
            (Some(established), Some(hint)) if established != hint => {
                Disputed { established, claimed: hint }
            },
            (Some(source), _) | (None, Some(source)) => EstablishedState::from_source(source),
            (None, None) => NoKeyEstablished,
        }
    }
}

/// One credential path the manager may try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// Wallet signature
    Wallet,
    /// Passkey PRF
    PasskeyPrf,
    /// Passkey assertion plus local randomness
    PasskeyFallback,
    /// PBKDF2-stretched PIN
    Pin,
}

impl Candidate {
    /// Source tag of keys produced by this path.
    pub fn source(self) -> KeySource {
        match self {
            Self::Wallet => KeySource::Eoa,
            Self::PasskeyPrf => KeySource::PasskeyPrf,
            Self::PasskeyFallback => KeySource::PasskeyFallback,
            Self::Pin => KeySource::Pin,
        }
    }
}

/// Capabilities present on the request, as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestShape {
    /// Requested credential type
    pub auth_type: AuthType,
    /// Account has a passkey registered
    pub passkey_on_file: bool,
    /// A passkey credential is usable on this device
    pub passkey_credential: bool,
}

/// Arbitration rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourcePolicy {
    migrate_legacy: bool,
    replace_device_local: bool,
}

impl SourcePolicy {
    /// Create a policy. With `migrate_legacy`, legacy identities are
    /// treated as unestablished.
    pub fn new(migrate_legacy: bool) -> Self {
        Self { migrate_legacy, replace_device_local: false }
    }

    /// Allow an explicit `PasskeyFallback` request to replace a published
    /// fallback key this device no longer holds.
    #[must_use]
    pub fn with_replace_device_local(mut self, replace: bool) -> Self {
        self.replace_device_local = replace;
        self
    }

    /// Ordered candidates for a request, or the failure to report instead.
    ///
    /// Later candidates are tried only when an earlier one reports the
    /// capability as not supported. A published `passkey-fallback` key
    /// cannot be re-derived, so reaching the policy for one fails closed
    /// unless replacement is allowed.
    pub fn decide(
        &self,
        state: EstablishedState,
        shape: RequestShape,
    ) -> Result<Vec<Candidate>, DeriveFailure> {
        let requested = shape.auth_type;
        let conflict = |established| DeriveFailure::SourceConflict { established, requested };
        let passkey = |candidate| {
            if shape.passkey_credential {
                Ok(vec![candidate])
            } else {
                Err(DeriveFailure::RequiresPasskeySetup)
            }
        };

        match state {
            EstablishedState::EstablishedAsPin => Ok(vec![Candidate::Pin]),
            EstablishedState::NoKeyEstablished => match requested {
                AuthType::Wallet => Ok(vec![Candidate::Wallet]),
                AuthType::Passkey => passkey(Candidate::PasskeyPrf),
                AuthType::PasskeyFallback => passkey(Candidate::PasskeyFallback),
                AuthType::Embedded if shape.passkey_on_file && shape.passkey_credential => {
                    Ok(vec![Candidate::PasskeyPrf, Candidate::Pin])
                },
                AuthType::Embedded => Ok(vec![Candidate::Pin]),
            },
            EstablishedState::EstablishedAsWalletOrPasskey(source) => match (source, requested) {
                (KeySource::Eoa, AuthType::Wallet) => Ok(vec![Candidate::Wallet]),
                (KeySource::PasskeyPrf, AuthType::Passkey | AuthType::Embedded) => {
                    passkey(Candidate::PasskeyPrf)
                },
                (KeySource::PasskeyFallback, AuthType::PasskeyFallback)
                    if self.replace_device_local =>
                {
                    passkey(Candidate::PasskeyFallback)
                },
                _ => Err(conflict(source)),
            },
            EstablishedState::UnverifiedLegacy if self.migrate_legacy => {
                self.decide(EstablishedState::NoKeyEstablished, shape)
            },
            EstablishedState::UnverifiedLegacy => Err(conflict(KeySource::Legacy)),
            EstablishedState::Disputed { established, .. } => Err(conflict(established)),
        }
    }

    /// Whether a cached key from `source` may answer a request of `auth_type`.
    pub fn permits_cached(&self, source: KeySource, auth_type: AuthType) -> bool {
        matches!(
            (source, auth_type),
            (KeySource::Pin, _)
                | (KeySource::Eoa, AuthType::Wallet)
                | (KeySource::PasskeyPrf, AuthType::Passkey | AuthType::Embedded)
                | (KeySource::PasskeyFallback, AuthType::PasskeyFallback)
        )
    }
}
