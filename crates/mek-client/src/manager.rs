//! Key manager: the single entry point for obtaining a messaging key.
//!
//! Request flow for one identity:
//!
//! 1. Serialize on the identity's request lock (one prompt per identity).
//! 2. Serve from the session cache if the cached source allows the request
//!    and the caller's hint does not contradict it.
//! 3. Read the published row, combine it with the caller's hint and resolve
//!    the established state.
//! 4. Ask the policy for an ordered candidate list and try each adapter.
//! 5. Cache the key and publish its public half. A publish that would
//!    establish or change the identity's source is awaited; if the row
//!    moved since step 3 the key is evicted and the request fails.
//!
//! Publishing happens only after a successful directory read, so an
//! unreachable directory can never be overwritten blindly.

use std::sync::Arc;

use mek_crypto::{DerivedMessagingKey, Identity, KeySource, PublicKey};
use tokio::runtime::Handle;
use zeroize::Zeroizing;

use crate::{
    adapters::{
        AttemptOutcome, PasskeyFallbackAdapter, PasskeyPrfAdapter, PinAdapter,
        WalletSignatureAdapter,
    },
    cache::SessionKeyCache,
    config::MekConfig,
    directory::{KeyDirectory, RemoteSourceRecord},
    env::Environment,
    error::{AdapterError, DeriveFailure},
    pin_store::PinRecordStore,
    policy::{Candidate, EstablishedState, RequestShape, SourceEvidence, SourcePolicy},
    publisher::{PublicKeyPublisher, PublishResult},
    request::{AuthType, DerivedKey, KeyOutcome, KeyRequest},
};

/// Result of the directory read for one request.
#[derive(Clone, Copy)]
struct RemoteView<'a> {
    row: Option<&'a RemoteSourceRecord>,
    read_ok: bool,
}

/// Orchestrates adapters, source policy, session cache and publication.
///
/// Cheap to clone; clones share the cache, its request locks and the
/// backing stores.
#[derive(Clone)]
pub struct KeyManager<E: Environment> {
    config: MekConfig,
    env: E,
    cache: SessionKeyCache,
    pins: PinAdapter,
    publisher: PublicKeyPublisher<E>,
    policy: SourcePolicy,
}

impl<E: Environment> KeyManager<E> {
    /// Create a manager with an empty session cache.
    pub fn new(
        config: MekConfig,
        env: E,
        directory: Arc<dyn KeyDirectory>,
        pin_records: Arc<dyn PinRecordStore>,
    ) -> Self {
        Self {
            config,
            pins: PinAdapter::new(pin_records, config.pin_iterations),
            publisher: PublicKeyPublisher::new(directory, env.clone()),
            policy: SourcePolicy::new(config.migrate_legacy)
                .with_replace_device_local(config.replace_device_local),
            cache: SessionKeyCache::new(),
            env,
        }
    }

    /// Use `cache` instead of a private one. Managers sharing a cache also
    /// share its request locks, so one identity is prompted once across
    /// all of them.
    #[must_use]
    pub fn with_cache(mut self, cache: SessionKeyCache) -> Self {
        self.cache = cache;
        self
    }

    /// Session cache backing this manager.
    pub fn cache(&self) -> &SessionKeyCache {
        &self.cache
    }

    /// Return the key the identity is established with, deriving it if
    /// needed.
    ///
    /// Concurrent calls for the same identity are coalesced: the second
    /// waits for the first and is then served from the cache.
    pub async fn get_or_derive(&self, request: KeyRequest) -> KeyOutcome {
        let identity = Identity::parse(&request.identity)?;
        let lock = self.cache.request_lock(&identity);
        let outcome = {
            let _guard = lock.lock().await;
            self.get_or_derive_locked(&identity, &request).await
        };
        drop(lock);
        self.cache.release_request_locks();

        if let Err(failure) = &outcome {
            tracing::debug!(identity = %identity, class = ?failure.class(), error = %failure, "key request failed");
        }
        outcome
    }

    /// Replace the PIN for an identity established as PIN.
    ///
    /// The old PIN is checked against the published key (or the local record
    /// if nothing is published). The directory must be reachable.
    pub async fn rotate_pin(&self, identity: &str, old_pin: &str, new_pin: &str) -> KeyOutcome {
        let identity = Identity::parse(identity)?;
        let lock = self.cache.request_lock(&identity);
        let outcome = {
            let _guard = lock.lock().await;
            self.rotate_pin_locked(&identity, old_pin, new_pin).await
        };
        drop(lock);
        self.cache.release_request_locks();
        outcome
    }

    /// Cached key for `identity`, without prompting or network access.
    pub fn cached(&self, identity: &str) -> Option<DerivedKey> {
        let identity = Identity::parse(identity).ok()?;
        self.cache
            .get(&identity)
            .filter(|key| key.derived_from() != KeySource::Legacy)
            .map(|key| DerivedKey::new(key, true))
    }

    /// Drop one identity from the session cache.
    pub fn forget(&self, identity: &str) -> bool {
        let Ok(identity) = Identity::parse(identity) else {
            return false;
        };
        let removed = self.cache.clear(&identity);
        if removed {
            tracing::info!(identity = %identity, "cleared cached messaging key");
        }
        removed
    }

    /// Drop every cached key.
    pub fn logout(&self) {
        let count = self.cache.len();
        self.cache.clear_all();
        tracing::info!(count, "cleared all cached messaging keys");
    }

    async fn get_or_derive_locked(&self, identity: &Identity, request: &KeyRequest) -> KeyOutcome {
        let cached = self.cache.get(identity);
        let cached_source = cached.as_ref().map(|key| key.derived_from());

        if let Some(key) = cached {
            let source = key.derived_from();
            if source != KeySource::Legacy {
                let contradicted = source != KeySource::Pin
                    && request.source_hint.is_some_and(|hint| hint != source);
                if contradicted || !self.policy.permits_cached(source, request.auth_type) {
                    return Err(DeriveFailure::SourceConflict {
                        established: source,
                        requested: request.auth_type,
                    });
                }
                tracing::debug!(identity = %identity, source = %source, "serving cached messaging key");
                return Ok(DerivedKey::new(key, true));
            }
        }

        let remote = match self.publisher.fetch_remote_source(identity).await {
            Ok(row) => Ok(row),
            Err(e) if request.source_hint.is_none() => {
                return Err(DeriveFailure::DirectoryUnavailable { reason: e.to_string() });
            },
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "directory read failed; relying on source hint");
                Err(e)
            },
        };
        let view = RemoteView { row: remote.as_ref().ok().and_then(Option::as_ref), read_ok: remote.is_ok() };

        let evidence = SourceEvidence {
            cached: cached_source,
            remote: view.row.map(|row| row.key_source),
            hint: request.source_hint,
        };
        let state = evidence.resolve();
        let shape = RequestShape {
            auth_type: request.auth_type,
            passkey_on_file: request.has_passkey_on_file,
            passkey_credential: request.passkey.is_some(),
        };
        let candidates = self.policy.decide(state, shape)?;
        tracing::debug!(identity = %identity, state = ?state, candidates = ?candidates, "source policy decided");

        let key = self.attempt_candidates(identity, request, state, &candidates, view).await?;
        let key = Arc::new(key);
        self.cache.put(identity.clone(), Arc::clone(&key));

        if view.read_ok {
            self.publish_derived(identity, &key, view.row, request.auth_type).await?;
        } else {
            tracing::warn!(identity = %identity, "not publishing: directory state unknown");
        }

        Ok(DerivedKey::new(key, false))
    }

    async fn attempt_candidates(
        &self,
        identity: &Identity,
        request: &KeyRequest,
        state: EstablishedState,
        candidates: &[Candidate],
        remote: RemoteView<'_>,
    ) -> Result<DerivedMessagingKey, DeriveFailure> {
        for (index, candidate) in candidates.iter().enumerate() {
            match self.attempt(*candidate, identity, request, state, remote).await? {
                AttemptOutcome::Success(key) => return Ok(key),
                AttemptOutcome::Cancelled => return Err(DeriveFailure::Cancelled),
                AttemptOutcome::NotSupported if index + 1 < candidates.len() => {
                    tracing::debug!(identity = %identity, candidate = ?candidate, "candidate not supported; trying next");
                },
                AttemptOutcome::NotSupported => return Err(DeriveFailure::PrfUnsupportedUseFallback),
            }
        }
        Err(DeriveFailure::Internal { reason: "policy produced no candidates".into() })
    }

    async fn attempt(
        &self,
        candidate: Candidate,
        identity: &Identity,
        request: &KeyRequest,
        state: EstablishedState,
        remote: RemoteView<'_>,
    ) -> Result<AttemptOutcome, DeriveFailure> {
        let result = match candidate {
            Candidate::Wallet => {
                let Some(signer) = &request.wallet else {
                    return Err(DeriveFailure::UnavailableCapability {
                        reason: "no wallet signer supplied".into(),
                    });
                };
                WalletSignatureAdapter::new(signer.as_ref()).derive_key(identity).await
            },
            Candidate::PasskeyPrf => {
                let Some(passkey) = &request.passkey else {
                    return Err(DeriveFailure::RequiresPasskeySetup);
                };
                match PasskeyPrfAdapter::new(
                    passkey.authenticator.as_ref(),
                    &passkey.credential_id,
                    &passkey.relying_party_id,
                ) {
                    Ok(adapter) => adapter.derive_key(identity).await,
                    Err(e) => Err(e),
                }
            },
            Candidate::PasskeyFallback => {
                let Some(passkey) = &request.passkey else {
                    return Err(DeriveFailure::RequiresPasskeySetup);
                };
                match PasskeyFallbackAdapter::new(
                    passkey.authenticator.as_ref(),
                    &passkey.credential_id,
                    &passkey.relying_party_id,
                    &self.env,
                ) {
                    Ok(adapter) => adapter.derive_key(identity).await,
                    Err(e) => Err(e),
                }
            },
            Candidate::Pin => {
                let Some(pin) = &request.pin else {
                    return Err(DeriveFailure::PinRequired);
                };
                let remote_pin_key = remote
                    .row
                    .filter(|row| row.key_source == KeySource::Pin)
                    .map(|row| row.public_key);
                if state == EstablishedState::EstablishedAsPin
                    && !remote.read_ok
                    && !self.pins.has_record(identity)
                {
                    return Err(DeriveFailure::DirectoryUnavailable {
                        reason: "cannot verify PIN without published key or local record".into(),
                    });
                }
                self.establish_pin(identity, pin, remote_pin_key).await?
            },
        };
        AttemptOutcome::from_result(result).map_err(DeriveFailure::from)
    }

    async fn establish_pin(
        &self,
        identity: &Identity,
        pin: &Zeroizing<String>,
        remote_pin_key: Option<PublicKey>,
    ) -> Result<Result<DerivedMessagingKey, AdapterError>, DeriveFailure> {
        let pins = self.pins.clone();
        let pin = pin.clone();
        let identity = identity.clone();
        run_blocking(move || pins.establish(&pin, &identity, remote_pin_key.as_ref())).await
    }

    async fn rotate_pin_locked(&self, identity: &Identity, old_pin: &str, new_pin: &str) -> KeyOutcome {
        let remote = self
            .publisher
            .fetch_remote_source(identity)
            .await
            .map_err(|e| DeriveFailure::DirectoryUnavailable { reason: e.to_string() })?;

        let remote_pin_key = match &remote {
            Some(row) if row.key_source == KeySource::Pin => Some(row.public_key),
            Some(row) => {
                tracing::warn!(identity = %identity, source = %row.key_source, "PIN rotation refused: not a PIN identity");
                return Err(DeriveFailure::NoPinEstablished);
            },
            None => None,
        };

        let pins = self.pins.clone();
        let old_pin = Zeroizing::new(old_pin.to_string());
        let new_pin = Zeroizing::new(new_pin.to_string());
        let rotate_identity = identity.clone();
        let key = run_blocking(move || {
            pins.rotate(&rotate_identity, &old_pin, &new_pin, remote_pin_key.as_ref())
        })
        .await??;

        let key = Arc::new(key);
        self.cache.put(identity.clone(), Arc::clone(&key));
        tracing::info!(identity = %identity, key = %key.public_key().fingerprint(), "rotated PIN");
        self.publish_derived(identity, &key, remote.as_ref(), AuthType::Embedded).await?;

        Ok(DerivedKey::new(key, false))
    }

    /// Publish a freshly derived (and already cached) key against the row
    /// it was derived from.
    ///
    /// Keys that establish or change the identity's source are published
    /// inline. On refusal the cache entry is evicted and the request fails
    /// with the source that holds the row.
    async fn publish_derived(
        &self,
        identity: &Identity,
        key: &DerivedMessagingKey,
        observed: Option<&RemoteSourceRecord>,
        requested: AuthType,
    ) -> Result<(), DeriveFailure> {
        let public_key = key.public_key();
        let source = key.derived_from();

        if observed.is_some_and(|row| row.public_key == public_key && row.key_source == source) {
            tracing::debug!(identity = %identity, source = %source, "published key unchanged");
            return Ok(());
        }

        let same_source = observed.is_some_and(|row| row.key_source == source);
        if same_source && self.config.background_publish {
            if let Ok(handle) = Handle::try_current() {
                let publisher = self.publisher.clone();
                let cache = self.cache.clone();
                let identity = identity.clone();
                let observed = observed.cloned();
                handle.spawn(async move {
                    let result = publisher.publish(&identity, public_key, source, observed.as_ref()).await;
                    if matches!(result, PublishResult::Refused { .. }) {
                        cache.clear_key(&identity, &public_key);
                    }
                });
                return Ok(());
            }
        }

        match self.publisher.publish(identity, public_key, source, observed).await {
            PublishResult::Refused { established } => {
                self.cache.clear_key(identity, &public_key);
                Err(DeriveFailure::SourceConflict { established, requested })
            },
            PublishResult::Published | PublishResult::Unchanged | PublishResult::Failed => Ok(()),
        }
    }
}

/// Run CPU-bound work off the async executor when a runtime is available.
async fn run_blocking<T, F>(work: F) -> Result<Result<T, AdapterError>, DeriveFailure>
where
    F: FnOnce() -> Result<T, AdapterError> + Send + 'static,
    T: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => handle
            .spawn_blocking(work)
            .await
            .map_err(|e| DeriveFailure::Internal { reason: format!("PIN derivation task failed: {e}") }),
        Err(_) => Ok(work()),
    }
}
