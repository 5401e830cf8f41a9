//! Fuzz target for caller-supplied input normalization
//!
//! Identity parsing, PIN validation and relying-party id normalization all
//! run on untrusted strings before any key material exists.
//!
//! # Invariants
//!
//! - No input panics
//! - Parsed identities are lowercase, non-empty, whitespace-free, and
//!   reparse to themselves
//! - Accepted PINs are all ASCII digits and at least `MIN_PIN_LENGTH` long
//! - Normalized RP ids are idempotent: normalizing twice changes nothing
//! - The PRF salt depends only on the normalized identity

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mek_crypto::{Identity, MIN_PIN_LENGTH, normalize_rp_id, prf_salt, validate_pin};

#[derive(Debug, Arbitrary)]
struct Inputs {
    identity: String,
    pin: String,
    host: String,
}

fuzz_target!(|inputs: Inputs| {
    if let Ok(identity) = Identity::parse(&inputs.identity) {
        let normalized = identity.as_str();
        assert!(!normalized.is_empty());
        assert!(!normalized.chars().any(char::is_whitespace));

        if inputs.identity.is_ascii() {
            assert_eq!(normalized, inputs.identity.to_ascii_lowercase());
            let reparsed = Identity::parse(normalized).expect("normalized identity must reparse");
            assert_eq!(reparsed, identity);
            assert_eq!(prf_salt(&reparsed), prf_salt(&identity));
        }
    }

    if validate_pin(&inputs.pin).is_ok() {
        assert!(inputs.pin.len() >= MIN_PIN_LENGTH);
        assert!(inputs.pin.bytes().all(|b| b.is_ascii_digit()));
    }

    if let Ok(rp_id) = normalize_rp_id(&inputs.host) {
        assert!(!rp_id.is_empty());
        let again = normalize_rp_id(&rp_id).expect("normalized RP id must renormalize");
        assert_eq!(again, rp_id);
    }
});
