//! Credential adapters.
//!
//! Each adapter turns one kind of credential into raw secret bytes, then runs
//! the shared seed → keypair pipeline from [`mek_crypto`]. Adapters know
//! nothing about which source an identity is established with; that decision
//! belongs to [`crate::policy`].

mod passkey;
mod pin;
mod wallet;

use mek_crypto::DerivedMessagingKey;
pub use passkey::{PasskeyFallbackAdapter, PasskeyPrfAdapter};
pub use pin::PinAdapter;
pub use wallet::WalletSignatureAdapter;

use crate::error::AdapterError;

/// Tagged result of trying one candidate adapter.
///
/// `Cancelled` and `NotSupported` are expected outcomes, not errors: the
/// caller's state machine branches on them. Everything else stays an
/// [`AdapterError`].
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Adapter produced a key
    Success(DerivedMessagingKey),
    /// User dismissed the prompt
    Cancelled,
    /// Capability exists but lacks the required feature (PRF)
    NotSupported,
}

impl AttemptOutcome {
    /// Split an adapter result into an outcome or a hard error.
    pub fn from_result(
        result: Result<DerivedMessagingKey, AdapterError>,
    ) -> Result<Self, AdapterError> {
        match result {
            Ok(key) => Ok(Self::Success(key)),
            Err(e) if e.is_user_cancellable() => Ok(Self::Cancelled),
            Err(AdapterError::PrfNotSupported) => Ok(Self::NotSupported),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use mek_crypto::{Identity, SeedContext, derive_messaging_key};

    use super::*;

    #[test]
    fn outcome_tags_expected_failures() {
        assert!(matches!(
            AttemptOutcome::from_result(Err(AdapterError::Cancelled)),
            Ok(AttemptOutcome::Cancelled)
        ));
        assert!(matches!(
            AttemptOutcome::from_result(Err(AdapterError::PrfNotSupported)),
            Ok(AttemptOutcome::NotSupported)
        ));
        assert!(matches!(
            AttemptOutcome::from_result(Err(AdapterError::WrongPin)),
            Err(AdapterError::WrongPin)
        ));
    }

    #[test]
    fn outcome_wraps_success() {
        let identity = Identity::parse("0xabc").unwrap();
        let key = derive_messaging_key(b"secret", &identity, SeedContext::Eoa).unwrap();
        assert!(matches!(AttemptOutcome::from_result(Ok(key)), Ok(AttemptOutcome::Success(_))));
    }
}
