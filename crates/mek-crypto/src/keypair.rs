//! X25519 keypair generation from a seed.
//!
//! # Security Properties
//!
//! - Determinism: the seed is used directly as the X25519 scalar (clamped at
//!   use), so identical seeds give identical keypairs with no internal
//!   randomness
//! - Private key bytes are zeroized when the owning value is dropped

use std::fmt;

use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::{seed::Seed, source::KeySource};

/// Length of X25519 public and private keys in bytes.
pub const KEY_LEN: usize = 32;

/// X25519 public key. Safe to publish.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_LEN]);

impl PublicKey {
    /// Wrap raw public key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

/// X25519 private key. Never leaves the process.
pub struct PrivateKey([u8; KEY_LEN]);

impl PrivateKey {
    /// Raw private key bytes (the unclamped seed scalar).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// X25519 keypair.
#[derive(Debug)]
pub struct Keypair {
    public: PublicKey,
    private: PrivateKey,
}

impl Keypair {
    /// Public half.
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Private half.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }
}

/// Map a 32-byte seed to an X25519 keypair.
///
/// Pure function: same seed, same keypair.
pub fn keypair_from_seed(seed: &Seed) -> Keypair {
    let secret = StaticSecret::from(*seed.as_bytes());
    let public = X25519PublicKey::from(&secret);

    Keypair { public: PublicKey(public.to_bytes()), private: PrivateKey(secret.to_bytes()) }
}

/// Messaging encryption keypair plus the credential type that produced it.
#[derive(Debug)]
pub struct DerivedMessagingKey {
    keypair: Keypair,
    derived_from: KeySource,
}

impl DerivedMessagingKey {
    /// Tag a freshly generated keypair with its provenance.
    pub fn new(keypair: Keypair, derived_from: KeySource) -> Self {
        Self { keypair, derived_from }
    }

    /// Rebuild a key from stored private bytes.
    ///
    /// Used by callers that chose to persist a key outside this subsystem
    /// (including pre-versioning `legacy` keys). The public key is recomputed
    /// from the private bytes, never trusted from storage.
    pub fn from_private_bytes(private: [u8; KEY_LEN], derived_from: KeySource) -> Self {
        let seed = Seed::from_bytes(private);
        Self { keypair: keypair_from_seed(&seed), derived_from }
    }

    /// Public key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public
    }

    /// Private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.keypair.private
    }

    /// Provenance tag.
    pub fn derived_from(&self) -> KeySource {
        self.derived_from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_seed() -> Seed {
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = i as u8;
        }
        Seed::from_bytes(bytes)
    }

    #[test]
    fn same_seed_same_keypair() {
        let a = keypair_from_seed(&test_seed());
        let b = keypair_from_seed(&test_seed());

        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.private_key().as_bytes(), b.private_key().as_bytes());
    }

    #[test]
    fn one_byte_change_changes_keypair() {
        let mut bytes = *test_seed().as_bytes();
        bytes[31] ^= 0x80;
        let flipped = keypair_from_seed(&Seed::from_bytes(bytes));
        let original = keypair_from_seed(&test_seed());

        assert_ne!(flipped.public_key(), original.public_key());
        assert_ne!(flipped.private_key().as_bytes(), original.private_key().as_bytes());
    }

    #[test]
    fn private_key_is_the_seed() {
        let keypair = keypair_from_seed(&test_seed());
        assert_eq!(keypair.private_key().as_bytes(), test_seed().as_bytes());
    }

    #[test]
    fn rfc7748_alice_vector() {
        let private: [u8; 32] = [
            0x77, 0x07, 0x6d, 0x0a, 0x73, 0x18, 0xa5, 0x7d, 0x3c, 0x16, 0xc1, 0x72, 0x51, 0xb2,
            0x66, 0x45, 0xdf, 0x4c, 0x2f, 0x87, 0xeb, 0xc0, 0x99, 0x2a, 0xb1, 0x77, 0xfb, 0xa5,
            0x1d, 0xb9, 0x2c, 0x2a,
        ];
        let keypair = keypair_from_seed(&Seed::from_bytes(private));

        assert_eq!(
            keypair.public_key().to_string(),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
    }

    #[test]
    fn fingerprint_is_display_prefix() {
        let key = PublicKey::from_bytes([0xab; 32]);
        assert_eq!(key.fingerprint(), "abababab");
        assert!(key.to_string().starts_with(&key.fingerprint()));
        assert_eq!(key.to_string().len(), 64);
    }

    #[test]
    fn from_private_bytes_recomputes_public_key() {
        let original = keypair_from_seed(&test_seed());
        let restored =
            DerivedMessagingKey::from_private_bytes(*test_seed().as_bytes(), KeySource::Legacy);

        assert_eq!(restored.public_key(), original.public_key());
        assert_eq!(restored.derived_from(), KeySource::Legacy);
    }

    #[test]
    fn debug_output_redacts_private_key() {
        let key = DerivedMessagingKey::new(keypair_from_seed(&test_seed()), KeySource::Pin);
        let rendered = format!("{key:?}");

        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("000102030405"));
    }
}
