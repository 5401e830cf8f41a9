//! Caller-facing request and outcome types.

use std::{fmt, sync::Arc};

use mek_crypto::{DerivedMessagingKey, KeySource};
use zeroize::Zeroizing;

use crate::{
    capability::{PasskeyAuthenticator, WalletSigner},
    error::DeriveFailure,
};

/// How the caller's identity authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthType {
    /// Externally owned wallet account
    Wallet,
    /// Dedicated passkey account
    Passkey,
    /// Passkey account whose authenticator lacks PRF; caller opted in to
    /// the device-local fallback
    PasskeyFallback,
    /// Email or social login with neither wallet nor dedicated passkey
    Embedded,
}

/// Passkey credential available on this device.
#[derive(Clone)]
pub struct PasskeyCredential {
    pub(crate) credential_id: Vec<u8>,
    pub(crate) relying_party_id: String,
    pub(crate) authenticator: Arc<dyn PasskeyAuthenticator>,
}

impl fmt::Debug for PasskeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasskeyCredential")
            .field("credential_id_len", &self.credential_id.len())
            .field("relying_party_id", &self.relying_party_id)
            .finish_non_exhaustive()
    }
}

/// Request for the messaging key of one identity.
///
/// Built with [`KeyRequest::new`] and the `with_*` methods. Only the
/// capabilities the chosen route needs are consulted; supplying extra ones
/// never changes which source is used.
#[derive(Clone)]
pub struct KeyRequest {
    pub(crate) auth_type: AuthType,
    pub(crate) identity: String,
    pub(crate) wallet: Option<Arc<dyn WalletSigner>>,
    pub(crate) passkey: Option<PasskeyCredential>,
    pub(crate) has_passkey_on_file: bool,
    pub(crate) pin: Option<Zeroizing<String>>,
    pub(crate) source_hint: Option<KeySource>,
}

impl KeyRequest {
    /// Start a request for `identity` (raw, normalized on use).
    pub fn new(auth_type: AuthType, identity: impl Into<String>) -> Self {
        Self {
            auth_type,
            identity: identity.into(),
            wallet: None,
            passkey: None,
            has_passkey_on_file: false,
            pin: None,
            source_hint: None,
        }
    }

    /// Attach a wallet signing capability.
    #[must_use]
    pub fn with_wallet(mut self, signer: Arc<dyn WalletSigner>) -> Self {
        self.wallet = Some(signer);
        self
    }

    /// Attach a passkey credential. Also marks a passkey as on file.
    #[must_use]
    pub fn with_passkey(
        mut self,
        credential_id: impl Into<Vec<u8>>,
        relying_party_id: impl Into<String>,
        authenticator: Arc<dyn PasskeyAuthenticator>,
    ) -> Self {
        self.passkey = Some(PasskeyCredential {
            credential_id: credential_id.into(),
            relying_party_id: relying_party_id.into(),
            authenticator,
        });
        self.has_passkey_on_file = true;
        self
    }

    /// Override whether the account has a passkey registered.
    #[must_use]
    pub fn passkey_on_file(mut self, on_file: bool) -> Self {
        self.has_passkey_on_file = on_file;
        self
    }

    /// Attach a PIN. Held zeroizing and dropped with the request.
    #[must_use]
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(Zeroizing::new(pin.into()));
        self
    }

    /// Source the caller believes the identity is established with.
    ///
    /// Decides the route only when neither the session cache nor a readable
    /// directory row knows the source; a contradiction fails the request.
    #[must_use]
    pub fn with_source_hint(mut self, source: KeySource) -> Self {
        self.source_hint = Some(source);
        self
    }

    /// Credential type requested.
    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }
}

impl fmt::Debug for KeyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRequest")
            .field("auth_type", &self.auth_type)
            .field("identity", &self.identity)
            .field("wallet", &self.wallet.is_some())
            .field("passkey", &self.passkey)
            .field("has_passkey_on_file", &self.has_passkey_on_file)
            .field("pin", &self.pin.as_ref().map(|_| "<redacted>"))
            .field("source_hint", &self.source_hint)
            .finish()
    }
}

/// Whether a key can be reproduced elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guarantee {
    /// Same credential yields the same key on every device
    Portable,
    /// Key exists only on this device (passkey fallback)
    DeviceLocal,
}

impl Guarantee {
    /// Guarantee carried by keys from `source`.
    pub fn for_source(source: KeySource) -> Self {
        if source.is_portable() { Self::Portable } else { Self::DeviceLocal }
    }
}

/// Successful key request.
#[derive(Debug, Clone)]
pub struct DerivedKey {
    /// The messaging keypair, shared with the session cache.
    pub key: Arc<DerivedMessagingKey>,
    /// Reproducibility of the key.
    pub guarantee: Guarantee,
    /// True if served from the session cache without prompting.
    pub cached: bool,
}

impl DerivedKey {
    pub(crate) fn new(key: Arc<DerivedMessagingKey>, cached: bool) -> Self {
        let guarantee = Guarantee::for_source(key.derived_from());
        Self { key, guarantee, cached }
    }

    /// Source the key was derived from.
    pub fn source(&self) -> KeySource {
        self.key.derived_from()
    }
}

/// Result of [`crate::KeyManager::get_or_derive`].
pub type KeyOutcome = Result<DerivedKey, DeriveFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_shows_pin() {
        let request = KeyRequest::new(AuthType::Embedded, "user@example.com").with_pin("847203");
        let rendered = format!("{request:?}");

        assert!(!rendered.contains("847203"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn only_fallback_is_device_local() {
        assert_eq!(Guarantee::for_source(KeySource::PasskeyFallback), Guarantee::DeviceLocal);
        for source in [KeySource::Eoa, KeySource::PasskeyPrf, KeySource::Pin] {
            assert_eq!(Guarantee::for_source(source), Guarantee::Portable);
        }
    }

    #[test]
    fn passkey_on_file_can_be_set_without_credential() {
        let request = KeyRequest::new(AuthType::Embedded, "user@example.com").passkey_on_file(true);
        assert!(request.has_passkey_on_file);
        assert!(request.passkey.is_none());
    }
}
