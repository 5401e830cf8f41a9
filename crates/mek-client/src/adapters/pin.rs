//! PIN adapter.
//!
//! PBKDF2 makes every guess cost a full derivation, and the local record is a
//! hash over the resulting public key, so it gives no shortcut either. Every
//! method here is synchronous and CPU-bound; async callers should run it on a
//! blocking thread.

use std::sync::Arc;

use mek_crypto::{
    DerivedMessagingKey, Identity, PublicKey, SeedContext, derive_messaging_key, stretch_pin,
    validate_pin, verification_hash,
};
use zeroize::Zeroizing;

use crate::{
    error::AdapterError,
    pin_store::{PinRecordStore, PinVerificationRecord},
};

/// Derives and verifies PIN-based messaging keys.
#[derive(Clone)]
pub struct PinAdapter {
    records: Arc<dyn PinRecordStore>,
    iterations: u32,
}

impl PinAdapter {
    /// Create an adapter over a verification record store.
    pub fn new(records: Arc<dyn PinRecordStore>, iterations: u32) -> Self {
        Self { records, iterations }
    }

    /// True if this device holds a verification record for `identity`.
    pub fn has_record(&self, identity: &Identity) -> bool {
        self.records.load(identity).is_some()
    }

    /// Validate and stretch a PIN into 32 secret bytes.
    ///
    /// # Errors
    ///
    /// - `AdapterError::InvalidPin` before any cryptographic work
    pub fn derive_secret(
        &self,
        pin: &str,
        identity: &Identity,
    ) -> Result<Zeroizing<[u8; 32]>, AdapterError> {
        validate_pin(pin)?;
        Ok(stretch_pin(pin, identity, self.iterations)?)
    }

    /// Full PIN path: PIN → PBKDF2 → seed → keypair. No record is touched.
    pub fn derive_key(&self, pin: &str, identity: &Identity) -> Result<DerivedMessagingKey, AdapterError> {
        let secret = self.derive_secret(pin, identity)?;
        Ok(derive_messaging_key(&secret[..], identity, SeedContext::Pin)?)
    }

    /// Check a PIN against the local verification record.
    ///
    /// Returns `Ok(None)` when this device has no record for `identity`;
    /// no derivation runs in that case.
    pub fn verify(&self, pin: &str, identity: &Identity) -> Result<Option<bool>, AdapterError> {
        validate_pin(pin)?;
        let Some(record) = self.records.load(identity) else {
            return Ok(None);
        };

        let key = self.derive_key(pin, identity)?;
        Ok(Some(record.verification_hash == verification_hash(identity, &key.public_key())))
    }

    /// Check a PIN against a published public key.
    pub fn verify_against_remote(
        &self,
        pin: &str,
        identity: &Identity,
        remote_public_key: &PublicKey,
    ) -> Result<bool, AdapterError> {
        let key = self.derive_key(pin, identity)?;
        Ok(key.public_key() == *remote_public_key)
    }

    /// Derive the PIN key and bind it to this device.
    ///
    /// A published PIN key, when given, is authoritative: the derived key
    /// must match it, and a stale local record is replaced. Without one,
    /// an existing local record must match, and a missing record is created.
    ///
    /// # Errors
    ///
    /// - `AdapterError::InvalidPin` for a malformed PIN
    /// - `AdapterError::WrongPin` if the key matches neither check
    pub fn establish(
        &self,
        pin: &str,
        identity: &Identity,
        remote_public_key: Option<&PublicKey>,
    ) -> Result<DerivedMessagingKey, AdapterError> {
        let key = self.derive_key(pin, identity)?;
        let hash = verification_hash(identity, &key.public_key());
        let local = self.records.load(identity);

        match remote_public_key {
            Some(remote) if *remote != key.public_key() => return Err(AdapterError::WrongPin),
            Some(_) => {
                if local.as_ref().is_some_and(|record| record.verification_hash != hash) {
                    tracing::info!(identity = %identity, "replacing stale PIN verification record");
                }
            },
            None => {
                if let Some(record) = &local {
                    if record.verification_hash != hash {
                        return Err(AdapterError::WrongPin);
                    }
                }
            },
        }

        if local.is_none_or(|record| record.verification_hash != hash) {
            self.records
                .store(PinVerificationRecord { identity: identity.clone(), verification_hash: hash });
        }
        Ok(key)
    }

    /// Replace the PIN for an identity.
    ///
    /// The old PIN is checked against the published key if one is given,
    /// otherwise against the local record. On success the local record is
    /// replaced and the new key returned; publishing it is the caller's job.
    ///
    /// # Errors
    ///
    /// - `AdapterError::InvalidPin` if either PIN is malformed
    /// - `AdapterError::PinNotEstablished` with no record and no published key
    /// - `AdapterError::WrongPin` if the old PIN does not match
    pub fn rotate(
        &self,
        identity: &Identity,
        old_pin: &str,
        new_pin: &str,
        remote_public_key: Option<&PublicKey>,
    ) -> Result<DerivedMessagingKey, AdapterError> {
        validate_pin(old_pin)?;
        validate_pin(new_pin)?;

        let old_matches = match remote_public_key {
            Some(remote) => self.verify_against_remote(old_pin, identity, remote)?,
            None => self.verify(old_pin, identity)?.ok_or(AdapterError::PinNotEstablished)?,
        };
        if !old_matches {
            return Err(AdapterError::WrongPin);
        }

        let new_key = self.derive_key(new_pin, identity)?;
        self.records.store(PinVerificationRecord {
            identity: identity.clone(),
            verification_hash: verification_hash(identity, &new_key.public_key()),
        });
        Ok(new_key)
    }
}
