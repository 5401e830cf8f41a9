//! Local store for PIN verification records.
//!
//! A record proves that a PIN was accepted on this device for an identity.
//! It holds only a verification hash over the PIN-derived public key: never
//! the PIN, never the private key. Records are written on first PIN
//! establishment and replaced only on PIN rotation.

#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use mek_crypto::{Identity, VerificationHash};

/// Local-only proof of a previously accepted PIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinVerificationRecord {
    /// Identity the PIN belongs to.
    pub identity: Identity,
    /// Hash binding the identity to the PIN-derived public key.
    pub verification_hash: VerificationHash,
}

/// Storage backend for verification records.
///
/// Implementations are device-local (e.g. platform keychain or app storage).
/// The records are not secret enough to need encryption, but they must not be
/// shared across identities.
pub trait PinRecordStore: Send + Sync {
    /// Record for `identity`, if one exists.
    fn load(&self, identity: &Identity) -> Option<PinVerificationRecord>;

    /// Insert or replace the record for `record.identity`.
    fn store(&self, record: PinVerificationRecord);
}

/// In-memory record store.
///
/// Thread-safe via Arc<Mutex<_>>. Clone shares the same underlying storage.
#[derive(Clone, Default)]
pub struct MemoryPinRecordStore {
    inner: Arc<Mutex<HashMap<Identity, PinVerificationRecord>>>,
}

impl MemoryPinRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn count(&self) -> usize {
        self.inner.lock().expect("MemoryPinRecordStore mutex poisoned").len()
    }
}

impl PinRecordStore for MemoryPinRecordStore {
    fn load(&self, identity: &Identity) -> Option<PinVerificationRecord> {
        let inner = self.inner.lock().expect("MemoryPinRecordStore mutex poisoned");
        inner.get(identity).cloned()
    }

    fn store(&self, record: PinVerificationRecord) {
        let mut inner = self.inner.lock().expect("MemoryPinRecordStore mutex poisoned");
        inner.insert(record.identity.clone(), record);
    }
}
