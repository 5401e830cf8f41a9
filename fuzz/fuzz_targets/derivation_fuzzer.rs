//! Fuzz target for the secret → seed → keypair pipeline
//!
//! # Strategy
//!
//! - Arbitrary secret bytes (including empty)
//! - Arbitrary identities and every derivation context
//! - PRF outputs of every length
//!
//! # Invariants
//!
//! - Derivation is deterministic (same inputs → same public key)
//! - Empty secrets are rejected, never silently accepted
//! - Different contexts never yield the same key for the same secret
//! - PRF output normalization always yields 32 bytes for non-empty input

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mek_crypto::{CryptoError, Identity, SeedContext, derive_messaging_key, normalize_prf_output};

#[derive(Debug, Arbitrary)]
struct Scenario {
    secret: Vec<u8>,
    identity: String,
    context: Context,
    prf_output: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Context {
    Eoa,
    PasskeyPrf,
    PasskeyFallback,
    Pin,
}

impl From<Context> for SeedContext {
    fn from(context: Context) -> Self {
        match context {
            Context::Eoa => SeedContext::Eoa,
            Context::PasskeyPrf => SeedContext::PasskeyPrf,
            Context::PasskeyFallback => SeedContext::PasskeyFallback,
            Context::Pin => SeedContext::Pin,
        }
    }
}

fuzz_target!(|scenario: Scenario| {
    let Ok(identity) = Identity::parse(&scenario.identity) else {
        return;
    };
    let context = SeedContext::from(scenario.context);

    match derive_messaging_key(&scenario.secret, &identity, context) {
        Ok(first) => {
            let second = derive_messaging_key(&scenario.secret, &identity, context)
                .expect("derivation must be deterministic");
            assert_eq!(first.public_key(), second.public_key());

            let other_context = if matches!(context, SeedContext::Pin) {
                SeedContext::Eoa
            } else {
                SeedContext::Pin
            };
            let other = derive_messaging_key(&scenario.secret, &identity, other_context)
                .expect("same secret must derive under every context");
            assert_ne!(first.public_key(), other.public_key());
        },
        Err(CryptoError::EmptySecret) => assert!(scenario.secret.is_empty()),
        Err(other) => panic!("unexpected derivation error: {other}"),
    }

    match normalize_prf_output(&scenario.prf_output) {
        Ok(normalized) => assert_eq!(normalized.len(), 32),
        Err(_) => assert!(scenario.prf_output.is_empty()),
    }
});
