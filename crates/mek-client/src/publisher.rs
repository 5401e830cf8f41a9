//! Public-key publication.
//!
//! The only component that talks to the directory. Publishing is
//! best-effort: a failed publish is logged and the derived key stays usable.

use std::sync::Arc;

use mek_crypto::{Identity, KeySource, PublicKey};

use crate::{
    directory::{KeyDirectory, RemoteSourceRecord},
    env::Environment,
    error::DirectoryError,
};

/// What a publish attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishResult {
    /// Row written.
    Published,
    /// Row already held this key and source; nothing written.
    Unchanged,
    /// Row changed since it was read, or is established with another
    /// source; nothing written.
    Refused {
        /// Source on the row that was kept
        established: KeySource,
    },
    /// Directory error; logged and swallowed.
    Failed,
}

/// Reads and writes this client's rows in a [`KeyDirectory`].
pub struct PublicKeyPublisher<E: Environment> {
    directory: Arc<dyn KeyDirectory>,
    env: E,
}

impl<E: Environment> Clone for PublicKeyPublisher<E> {
    fn clone(&self) -> Self {
        Self { directory: Arc::clone(&self.directory), env: self.env.clone() }
    }
}

impl<E: Environment> PublicKeyPublisher<E> {
    /// Create a publisher over a directory.
    pub fn new(directory: Arc<dyn KeyDirectory>, env: E) -> Self {
        Self { directory, env }
    }

    /// Published row for `identity`, if any.
    pub async fn fetch_remote_source(
        &self,
        identity: &Identity,
    ) -> Result<Option<RemoteSourceRecord>, DirectoryError> {
        self.directory.fetch(identity).await
    }

    /// Publish `public_key` as the key for `identity`.
    ///
    /// `observed` is the row the caller based its derivation on. The row is
    /// re-read first: an identical row is left alone, and nothing is written
    /// if the row no longer matches `observed` or is established with a
    /// source other than `key_source` (legacy rows excepted). If the row
    /// cannot be read nothing is written. Never fails; the caller decides
    /// what a refusal means.
    pub async fn publish(
        &self,
        identity: &Identity,
        public_key: PublicKey,
        key_source: KeySource,
        observed: Option<&RemoteSourceRecord>,
    ) -> PublishResult {
        let current = match self.directory.fetch(identity).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "publish skipped: directory read failed");
                return PublishResult::Failed;
            },
        };

        if let Some(row) = &current {
            if row.public_key == public_key && row.key_source == key_source {
                tracing::debug!(identity = %identity, source = %key_source, "published key unchanged");
                return PublishResult::Unchanged;
            }

            let moved = observed.is_none_or(|seen| !seen.same_key(row));
            let other_source = row.key_source != key_source && row.key_source != KeySource::Legacy;
            if moved || other_source {
                tracing::error!(
                    identity = %identity,
                    source = %key_source,
                    established = %row.key_source,
                    moved,
                    "refusing to replace published key"
                );
                return PublishResult::Refused { established: row.key_source };
            }
        }

        let record =
            RemoteSourceRecord { public_key, key_source, updated_at: self.env.wall_clock_secs() };
        match self.directory.upsert(identity, record).await {
            Ok(()) => {
                tracing::info!(
                    identity = %identity,
                    source = %key_source,
                    key = %public_key.fingerprint(),
                    "published messaging key"
                );
                PublishResult::Published
            },
            Err(e) => {
                tracing::warn!(
                    identity = %identity,
                    transient = e.is_transient(),
                    error = %e,
                    "publish failed"
                );
                PublishResult::Failed
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;

    #[derive(Clone)]
    struct FixedClock(u64);

    impl Environment for FixedClock {
        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
        }

        fn wall_clock_secs(&self) -> u64 {
            self.0
        }
    }

    fn setup() -> (PublicKeyPublisher<FixedClock>, MemoryDirectory, Identity) {
        let dir = MemoryDirectory::new();
        let publisher = PublicKeyPublisher::new(Arc::new(dir.clone()), FixedClock(1_700_000_000));
        (publisher, dir, Identity::parse("0x1111").unwrap())
    }

    fn row(byte: u8, key_source: KeySource) -> RemoteSourceRecord {
        RemoteSourceRecord { public_key: PublicKey::from_bytes([byte; 32]), key_source, updated_at: 1 }
    }

    #[tokio::test]
    async fn publish_writes_row_with_timestamp() {
        let (publisher, dir, id) = setup();
        let key = PublicKey::from_bytes([5; 32]);

        assert_eq!(publisher.publish(&id, key, KeySource::Pin, None).await, PublishResult::Published);

        let row = dir.get(&id).expect("row should exist");
        assert_eq!(row.public_key, key);
        assert_eq!(row.key_source, KeySource::Pin);
        assert_eq!(row.updated_at, 1_700_000_000);
    }

    #[tokio::test]
    async fn identical_row_is_not_rewritten() {
        let (publisher, dir, id) = setup();
        let key = PublicKey::from_bytes([5; 32]);

        publisher.publish(&id, key, KeySource::Eoa, None).await;
        assert_eq!(publisher.publish(&id, key, KeySource::Eoa, None).await, PublishResult::Unchanged);
        assert_eq!(dir.upsert_count(), 1);
    }

    #[tokio::test]
    async fn pin_row_is_never_replaced_by_other_source() {
        let (publisher, dir, id) = setup();
        let pin = row(1, KeySource::Pin);
        dir.insert(id.clone(), pin.clone());

        let result =
            publisher.publish(&id, PublicKey::from_bytes([2; 32]), KeySource::PasskeyPrf, Some(&pin)).await;

        assert_eq!(result, PublishResult::Refused { established: KeySource::Pin });
        assert_eq!(dir.get(&id).map(|row| row.key_source), Some(KeySource::Pin));
    }

    #[tokio::test]
    async fn row_written_after_read_is_kept() {
        let (publisher, dir, id) = setup();
        dir.insert(id.clone(), row(1, KeySource::Pin));

        let result = publisher.publish(&id, PublicKey::from_bytes([2; 32]), KeySource::Eoa, None).await;

        assert_eq!(result, PublishResult::Refused { established: KeySource::Pin });
        assert_eq!(dir.upsert_count(), 0);
    }

    #[tokio::test]
    async fn same_source_replacement_needs_observed_row() {
        let (publisher, dir, id) = setup();
        let first = row(1, KeySource::PasskeyFallback);
        dir.insert(id.clone(), first.clone());

        let racing =
            publisher.publish(&id, PublicKey::from_bytes([2; 32]), KeySource::PasskeyFallback, None).await;
        assert_eq!(racing, PublishResult::Refused { established: KeySource::PasskeyFallback });

        let deliberate = publisher
            .publish(&id, PublicKey::from_bytes([2; 32]), KeySource::PasskeyFallback, Some(&first))
            .await;
        assert_eq!(deliberate, PublishResult::Published);
    }

    #[tokio::test]
    async fn legacy_row_may_be_migrated() {
        let (publisher, dir, id) = setup();
        let legacy = row(1, KeySource::Legacy);
        dir.insert(id.clone(), legacy.clone());

        let result =
            publisher.publish(&id, PublicKey::from_bytes([2; 32]), KeySource::Eoa, Some(&legacy)).await;

        assert_eq!(result, PublishResult::Published);
        assert_eq!(dir.get(&id).map(|row| row.key_source), Some(KeySource::Eoa));
    }

    #[tokio::test]
    async fn pin_rotation_replaces_pin_row() {
        let (publisher, dir, id) = setup();
        let old = row(1, KeySource::Pin);
        dir.insert(id.clone(), old.clone());

        let result = publisher.publish(&id, PublicKey::from_bytes([2; 32]), KeySource::Pin, Some(&old)).await;

        assert_eq!(result, PublishResult::Published);
        assert_eq!(dir.get(&id).map(|row| row.public_key), Some(PublicKey::from_bytes([2; 32])));
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let (publisher, dir, id) = setup();
        dir.set_reachable(false);

        let result = publisher.publish(&id, PublicKey::from_bytes([5; 32]), KeySource::Eoa, None).await;

        assert_eq!(result, PublishResult::Failed);
        assert!(publisher.fetch_remote_source(&id).await.is_err());
    }
}
