//! Public-key directory.
//!
//! One logical table keyed by identity: `{ public_key, key_source,
//! updated_at }`. Clients upsert only their own row and read rows to decide
//! which source an identity is established with. Rows are never deleted.

#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mek_crypto::{Identity, KeySource, PublicKey};

use crate::error::DirectoryError;

/// Published row for one identity. Never contains private material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSourceRecord {
    /// Published X25519 public key.
    pub public_key: PublicKey,
    /// Source the key was derived from.
    pub key_source: KeySource,
    /// Seconds since the Unix epoch of the last upsert.
    pub updated_at: u64,
}

impl RemoteSourceRecord {
    /// Same key and source, ignoring the timestamp.
    pub fn same_key(&self, other: &Self) -> bool {
        self.public_key == other.public_key && self.key_source == other.key_source
    }
}

/// Remote directory of published messaging keys.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Row for `identity`, if published.
    async fn fetch(&self, identity: &Identity) -> Result<Option<RemoteSourceRecord>, DirectoryError>;

    /// Insert or replace the row for `identity`.
    async fn upsert(
        &self,
        identity: &Identity,
        record: RemoteSourceRecord,
    ) -> Result<(), DirectoryError>;
}

/// In-memory directory.
///
/// Thread-safe via Arc<Mutex<_>>. Clone shares the same underlying table, so
/// two managers holding clones behave like two devices talking to the same
/// backend.
#[derive(Clone)]
pub struct MemoryDirectory {
    inner: Arc<Mutex<MemoryDirectoryInner>>,
}

/// Internal state for `MemoryDirectory`.
struct MemoryDirectoryInner {
    rows: HashMap<Identity, RemoteSourceRecord>,
    reachable: bool,
    upserts: usize,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    /// Create an empty, reachable directory.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryDirectoryInner {
                rows: HashMap::new(),
                reachable: true,
                upserts: 0,
            })),
        }
    }

    /// Simulate the backend going down or coming back.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.lock().expect("MemoryDirectory mutex poisoned").reachable = reachable;
    }

    /// Write a row directly, bypassing reachability and counters.
    pub fn insert(&self, identity: Identity, record: RemoteSourceRecord) {
        let mut inner = self.inner.lock().expect("MemoryDirectory mutex poisoned");
        inner.rows.insert(identity, record);
    }

    /// Read a row directly.
    pub fn get(&self, identity: &Identity) -> Option<RemoteSourceRecord> {
        let inner = self.inner.lock().expect("MemoryDirectory mutex poisoned");
        inner.rows.get(identity).cloned()
    }

    /// Number of successful upserts so far.
    pub fn upsert_count(&self) -> usize {
        self.inner.lock().expect("MemoryDirectory mutex poisoned").upserts
    }
}

#[async_trait]
impl KeyDirectory for MemoryDirectory {
    async fn fetch(&self, identity: &Identity) -> Result<Option<RemoteSourceRecord>, DirectoryError> {
        let inner = self.inner.lock().expect("MemoryDirectory mutex poisoned");
        if !inner.reachable {
            return Err(DirectoryError::Unreachable { reason: "memory directory offline".into() });
        }
        Ok(inner.rows.get(identity).cloned())
    }

    async fn upsert(
        &self,
        identity: &Identity,
        record: RemoteSourceRecord,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.inner.lock().expect("MemoryDirectory mutex poisoned");
        if !inner.reachable {
            return Err(DirectoryError::Unreachable { reason: "memory directory offline".into() });
        }
        inner.rows.insert(identity.clone(), record);
        inner.upserts += 1;
        Ok(())
    }
}
