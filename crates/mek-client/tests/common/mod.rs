//! Mock capabilities and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use mek_client::{
    AssertionRequest, AssertionResponse, CapabilityError, Environment, KeyManager, MekConfig,
    MemoryDirectory, MemoryPinRecordStore, PasskeyAuthenticator, WalletSigner,
};

/// Rounds used by tests that do not exercise the production count.
pub const TEST_ITERATIONS: u32 = 1_000;

/// Deterministic environment: random bytes come from a counter.
#[derive(Clone)]
pub struct TestEnv {
    counter: Arc<AtomicUsize>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Distinct random streams model distinct devices.
    pub fn starting_at(first: usize) -> Self {
        Self { counter: Arc::new(AtomicUsize::new(first)) }
    }
}

impl Environment for TestEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        let fill = self.counter.fetch_add(1, Ordering::SeqCst) as u8;
        buffer.fill(fill);
    }

    fn wall_clock_secs(&self) -> u64 {
        1_700_000_000
    }
}

/// Wallet that signs deterministically and counts prompts.
pub struct CountingSigner {
    calls: AtomicUsize,
    delay: Option<Duration>,
    cancel: bool,
}

impl CountingSigner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), delay: None, cancel: false })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), delay: Some(delay), cancel: false })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), delay: None, cancel: true })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for CountingSigner {
    async fn sign_message(&self, account: &str, message: &str) -> Result<Vec<u8>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.cancel {
            return Err(CapabilityError::Cancelled);
        }
        let mut signature: Vec<u8> = message.bytes().rev().collect();
        signature.extend_from_slice(account.as_bytes());
        Ok(signature)
    }
}

/// Authenticator with configurable PRF support that counts prompts.
pub struct CountingAuthenticator {
    calls: AtomicUsize,
    prf_output: Option<Vec<u8>>,
}

impl CountingAuthenticator {
    pub fn with_prf() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), prf_output: Some(vec![0x5a; 32]) })
    }

    pub fn without_prf() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), prf_output: None })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PasskeyAuthenticator for CountingAuthenticator {
    async fn get_assertion(
        &self,
        _request: AssertionRequest,
    ) -> Result<AssertionResponse, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AssertionResponse { prf_output: self.prf_output.clone() })
    }
}

/// Test config: fast PBKDF2, publication awaited inline.
pub fn test_config() -> MekConfig {
    MekConfig::default().with_pin_iterations(TEST_ITERATIONS).with_background_publish(false)
}

/// One "device": its own cache and PIN records, sharing `directory`.
pub fn device(directory: &MemoryDirectory, config: MekConfig) -> KeyManager<TestEnv> {
    KeyManager::new(
        config,
        TestEnv::new(),
        Arc::new(directory.clone()),
        Arc::new(MemoryPinRecordStore::new()),
    )
}
