//! Property-based tests for MEK derivation
//!
//! These tests verify the invariants every device relies on:
//!
//! 1. **Determinism**: same secret and identity always give the same keypair
//! 2. **Identity separation**: different identities give different keypairs
//! 3. **Context separation**: the same bytes fed through two credential paths
//!    give different seeds
//! 4. **Normalization**: identity case never changes the result

use mek_crypto::{
    Identity, SeedContext, derive_messaging_key, derive_seed, normalize_rp_id, validate_pin,
};
use proptest::prelude::*;

fn identity_strategy() -> impl Strategy<Value = String> {
    "0x[0-9a-fA-F]{40}"
}

fn context_strategy() -> impl Strategy<Value = SeedContext> {
    prop_oneof![
        Just(SeedContext::Eoa),
        Just(SeedContext::PasskeyPrf),
        Just(SeedContext::PasskeyFallback),
        Just(SeedContext::Pin),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_derivation_deterministic(
        secret in prop::collection::vec(any::<u8>(), 1..128),
        raw_identity in identity_strategy(),
        context in context_strategy(),
    ) {
        let identity = Identity::parse(&raw_identity).unwrap();

        let first = derive_messaging_key(&secret, &identity, context).unwrap();
        let second = derive_messaging_key(&secret, &identity, context).unwrap();

        prop_assert_eq!(first.public_key(), second.public_key());
        prop_assert_eq!(first.private_key().as_bytes(), second.private_key().as_bytes());
    }

    #[test]
    fn prop_identity_case_is_irrelevant(
        secret in prop::collection::vec(any::<u8>(), 1..128),
        raw_identity in identity_strategy(),
    ) {
        let upper = Identity::parse(&raw_identity.to_uppercase()).unwrap();
        let lower = Identity::parse(&raw_identity.to_lowercase()).unwrap();

        let a = derive_messaging_key(&secret, &upper, SeedContext::Eoa).unwrap();
        let b = derive_messaging_key(&secret, &lower, SeedContext::Eoa).unwrap();

        prop_assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn prop_identities_are_separated(
        secret in prop::collection::vec(any::<u8>(), 1..128),
        id_a in identity_strategy(),
        id_b in identity_strategy(),
    ) {
        let a = Identity::parse(&id_a).unwrap();
        let b = Identity::parse(&id_b).unwrap();
        prop_assume!(a != b);

        let key_a = derive_messaging_key(&secret, &a, SeedContext::Pin).unwrap();
        let key_b = derive_messaging_key(&secret, &b, SeedContext::Pin).unwrap();

        prop_assert_ne!(key_a.public_key(), key_b.public_key());
    }

    #[test]
    fn prop_contexts_are_separated(
        secret in prop::collection::vec(any::<u8>(), 1..128),
        raw_identity in identity_strategy(),
        first in context_strategy(),
        second in context_strategy(),
    ) {
        prop_assume!(first != second);
        let identity = Identity::parse(&raw_identity).unwrap();

        let seed_a = derive_seed(&secret, &identity, first).unwrap();
        let seed_b = derive_seed(&secret, &identity, second).unwrap();

        prop_assert_ne!(seed_a.as_bytes(), seed_b.as_bytes());
    }

    #[test]
    fn prop_numeric_pins_of_valid_length_pass(pin in "[0-9]{6,12}") {
        prop_assert!(validate_pin(&pin).is_ok());
    }

    #[test]
    fn prop_pins_with_a_non_digit_fail(
        prefix in "[0-9]{0,6}",
        bad in "[^0-9]",
        suffix in "[0-9]{0,6}",
    ) {
        let pin = format!("{prefix}{bad}{suffix}");
        prop_assert!(validate_pin(&pin).is_err());
    }

    #[test]
    fn prop_rp_id_normalization_is_idempotent(
        labels in prop::collection::vec("[a-z0-9]{1,10}", 1..5),
        port in prop::option::of(1u16..),
    ) {
        let mut host = labels.join(".");
        if let Some(port) = port {
            host = format!("{host}:{port}");
        }

        if let Ok(once) = normalize_rp_id(&host) {
            prop_assert_eq!(normalize_rp_id(&once).unwrap(), once);
        }
    }
}

#[test]
fn public_key_display_is_lowercase_hex() {
    let identity = Identity::parse("0x1111111111111111111111111111111111111111").unwrap();
    let key = derive_messaging_key(&[0x5a; 65], &identity, SeedContext::Eoa).unwrap();

    assert_eq!(hex::encode(key.public_key().as_bytes()), key.public_key().to_string());
}
