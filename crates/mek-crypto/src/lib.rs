//! MEK Cryptographic Primitives
//!
//! Deterministic building blocks for messaging encryption keys. Every function
//! in this crate is pure: no I/O, no clocks, no internal randomness. Callers
//! supply the credential secret and get back the same keypair on every device.
//!
//! # Derivation Pipeline
//!
//! Each credential source produces raw secret bytes in its own way. From
//! there, every source goes through the same two steps, separated only by the
//! HKDF `info` label.
//!
//! ```text
//! wallet signature ─┐
//! passkey PRF ──────┼──▶ HKDF-SHA256(salt = domain, info = "<purpose>:<identity>")
//! PBKDF2(PIN) ──────┘            │
//!                                ▼
//!                          32-byte Seed
//!                                │
//!                                ▼
//!                      X25519 keypair (seed = scalar)
//! ```
//!
//! # Determinism
//!
//! For a fixed `(identity, secret, MEK_VERSION)` the resulting keypair is
//! byte-identical across implementations. The inputs that participate are:
//!
//! - the lowercased identity ([`Identity`])
//! - the protocol constants in this crate ([`MEK_VERSION`], [`HKDF_SALT`],
//!   the wallet message template, the PIN and PRF salt labels)
//! - [`DEFAULT_PIN_ITERATIONS`] for the PIN path
//!
//! Changing any of them changes every derived key and is a versioned
//! migration.
//!
//! # Security
//!
//! - Seeds, stretched PINs and private keys are zeroized on drop
//! - PIN verification hashes bind the resulting public key, so checking a
//!   guess against a stolen hash still costs the full PBKDF2 derivation
//! - `Debug` output never contains private material

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod identity;
mod keypair;
pub mod passkey;
pub mod pin;
mod seed;
mod source;
pub mod wallet;

pub use error::{CryptoError, IdentityError, PinValidationError};
pub use identity::Identity;
pub use keypair::{
    DerivedMessagingKey, KEY_LEN, Keypair, PrivateKey, PublicKey, keypair_from_seed,
};
pub use passkey::{normalize_prf_output, normalize_rp_id, prf_salt};
pub use pin::{
    DEFAULT_PIN_ITERATIONS, MIN_PIN_LENGTH, VerificationHash, stretch_pin, validate_pin,
    verification_hash,
};
pub use seed::{HKDF_SALT, SEED_LEN, Seed, derive_seed};
pub use source::{KeySource, SeedContext, UnknownKeySource};
pub use wallet::{APP_DOMAIN, MEK_VERSION, wallet_message};

/// Run the shared tail of every credential path: secret → seed → keypair.
///
/// The returned key is tagged with the [`KeySource`] matching `context`.
pub fn derive_messaging_key(
    secret: &[u8],
    identity: &Identity,
    context: SeedContext,
) -> Result<DerivedMessagingKey, CryptoError> {
    let seed = derive_seed(secret, identity, context)?;
    Ok(DerivedMessagingKey::new(keypair_from_seed(&seed), context.into()))
}
