//! Session key cache.
//!
//! Keys live here, in memory, for the lifetime of the process or until
//! logout. There is no persistence, no TTL and no eviction. Concurrent reads
//! are allowed; writes are serialized.
//!
//! The cache also carries the per-identity request locks, so every manager
//! sharing a cache shares one prompt per identity.

#![allow(clippy::expect_used, reason = "Lock poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
};

use mek_crypto::{DerivedMessagingKey, Identity, PublicKey};

type RequestLocks = Arc<Mutex<HashMap<Identity, Arc<tokio::sync::Mutex<()>>>>>;

/// In-memory map from normalized identity to derived key.
///
/// Injectable rather than global: each [`crate::KeyManager`] owns one, and
/// clones share the same storage and request locks.
#[derive(Clone, Default)]
pub struct SessionKeyCache {
    entries: Arc<RwLock<HashMap<Identity, Arc<DerivedMessagingKey>>>>,
    requests: RequestLocks,
}

impl SessionKeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached key for `identity`.
    pub fn get(&self, identity: &Identity) -> Option<Arc<DerivedMessagingKey>> {
        let entries = self.entries.read().expect("SessionKeyCache lock poisoned");
        entries.get(identity).cloned()
    }

    /// Insert or replace the key for `identity`.
    pub fn put(&self, identity: Identity, key: Arc<DerivedMessagingKey>) {
        let mut entries = self.entries.write().expect("SessionKeyCache lock poisoned");
        entries.insert(identity, key);
    }

    /// Remove one identity. Returns true if an entry was present.
    pub fn clear(&self, identity: &Identity) -> bool {
        let mut entries = self.entries.write().expect("SessionKeyCache lock poisoned");
        entries.remove(identity).is_some()
    }

    /// Remove `identity` only if it still holds `public_key`.
    pub(crate) fn clear_key(&self, identity: &Identity, public_key: &PublicKey) -> bool {
        let mut entries = self.entries.write().expect("SessionKeyCache lock poisoned");
        if entries.get(identity).is_some_and(|key| key.public_key() == *public_key) {
            entries.remove(identity);
            return true;
        }
        false
    }

    /// Remove every entry (global logout).
    pub fn clear_all(&self) {
        let mut entries = self.entries.write().expect("SessionKeyCache lock poisoned");
        entries.clear();
    }

    /// Number of cached identities.
    pub fn len(&self) -> usize {
        self.entries.read().expect("SessionKeyCache lock poisoned").len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock serializing key requests for `identity`.
    pub(crate) fn request_lock(&self, identity: &Identity) -> Arc<tokio::sync::Mutex<()>> {
        let mut requests = self.requests.lock().expect("request lock table poisoned");
        Arc::clone(requests.entry(identity.clone()).or_default())
    }

    /// Drop request locks nobody holds.
    pub(crate) fn release_request_locks(&self) {
        let mut requests = self.requests.lock().expect("request lock table poisoned");
        requests.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use mek_crypto::{SeedContext, derive_messaging_key};

    use super::*;

    fn key(identity: &Identity) -> Arc<DerivedMessagingKey> {
        Arc::new(derive_messaging_key(b"secret", identity, SeedContext::Eoa).unwrap())
    }

    #[test]
    fn put_get_by_normalized_identity() {
        let cache = SessionKeyCache::new();
        let id = Identity::parse("0xABC").unwrap();
        let stored = key(&id);

        cache.put(id.clone(), Arc::clone(&stored));

        let found = cache.get(&Identity::parse("0xabc").unwrap()).expect("should be cached");
        assert_eq!(found.public_key(), stored.public_key());
    }

    #[test]
    fn clear_single_identity() {
        let cache = SessionKeyCache::new();
        let a = Identity::parse("0xa").unwrap();
        let b = Identity::parse("0xb").unwrap();
        cache.put(a.clone(), key(&a));
        cache.put(b.clone(), key(&b));

        assert!(cache.clear(&a));
        assert!(!cache.clear(&a));
        assert!(cache.get(&a).is_none());
        assert!(cache.get(&b).is_some());
    }

    #[test]
    fn clear_all_empties() {
        let cache = SessionKeyCache::new();
        let a = Identity::parse("0xa").unwrap();
        cache.put(a.clone(), key(&a));

        cache.clear_all();

        assert!(cache.is_empty());
    }

    #[test]
    fn clear_key_leaves_replaced_entry() {
        let cache = SessionKeyCache::new();
        let a = Identity::parse("0xa").unwrap();
        let stale = PublicKey::from_bytes([7; 32]);
        cache.put(a.clone(), key(&a));

        assert!(!cache.clear_key(&a, &stale));
        assert!(cache.clear_key(&a, &key(&a).public_key()));
        assert!(cache.is_empty());
    }

    #[test]
    fn clones_share_request_locks() {
        let cache = SessionKeyCache::new();
        let a = Identity::parse("0xa").unwrap();

        let held = cache.request_lock(&a);
        assert!(Arc::ptr_eq(&held, &cache.clone().request_lock(&a)));

        drop(held);
        cache.release_request_locks();
        assert!(cache.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn clones_share_entries() {
        let cache = SessionKeyCache::new();
        let view = cache.clone();
        let a = Identity::parse("0xa").unwrap();

        cache.put(a.clone(), key(&a));
        assert_eq!(view.len(), 1);
    }
}
