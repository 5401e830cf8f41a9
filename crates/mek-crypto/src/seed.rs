//! Seed derivation using HKDF

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{error::CryptoError, identity::Identity, source::SeedContext};

/// HKDF salt: fixed application and protocol-version domain string.
pub const HKDF_SALT: &[u8] = b"mek-messaging-encryption-key:v1";

/// Seed length in bytes. Matches the X25519 scalar size.
pub const SEED_LEN: usize = 32;

/// Uniformly distributed 32-byte seed. Sole input to keypair generation.
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    /// Wrap raw seed bytes.
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw seed bytes.
    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl Drop for Seed {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Derive a seed from credential secret bytes.
///
/// `info` is `"<purpose>:<identity>"`, which keeps seeds from different
/// credential paths and different identities apart even when the secret bytes
/// are identical.
///
/// # Errors
///
/// - `CryptoError::EmptySecret` if `secret` is empty
pub fn derive_seed(
    secret: &[u8],
    identity: &Identity,
    context: SeedContext,
) -> Result<Seed, CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::EmptySecret);
    }

    let hkdf = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret);
    let info = format!("{}:{}", context.purpose(), identity.as_str());

    let mut seed = [0u8; SEED_LEN];
    let Ok(()) = hkdf.expand(info.as_bytes(), &mut seed) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    Ok(Seed(seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::MEK_VERSION;

    fn alice() -> Identity {
        Identity::parse("0xa11ce00000000000000000000000000000000000").unwrap()
    }

    fn bob() -> Identity {
        Identity::parse("0xb0b0000000000000000000000000000000000000").unwrap()
    }

    #[test]
    fn derive_is_deterministic() {
        let seed1 = derive_seed(b"secret", &alice(), SeedContext::Eoa).unwrap();
        let seed2 = derive_seed(b"secret", &alice(), SeedContext::Eoa).unwrap();

        assert_eq!(seed1.as_bytes(), seed2.as_bytes(), "same inputs must produce same output");
    }

    #[test]
    fn different_identities_produce_different_seeds() {
        let seed_a = derive_seed(b"secret", &alice(), SeedContext::Eoa).unwrap();
        let seed_b = derive_seed(b"secret", &bob(), SeedContext::Eoa).unwrap();

        assert_ne!(seed_a.as_bytes(), seed_b.as_bytes());
    }

    #[test]
    fn different_contexts_produce_different_seeds() {
        let secret = [0x42u8; 32];
        let eoa = derive_seed(&secret, &alice(), SeedContext::Eoa).unwrap();
        let pin = derive_seed(&secret, &alice(), SeedContext::Pin).unwrap();
        let prf = derive_seed(&secret, &alice(), SeedContext::PasskeyPrf).unwrap();

        assert_ne!(eoa.as_bytes(), pin.as_bytes(), "wallet and PIN seeds must not collide");
        assert_ne!(eoa.as_bytes(), prf.as_bytes());
        assert_ne!(pin.as_bytes(), prf.as_bytes());
    }

    #[test]
    fn case_variants_of_identity_agree() {
        let upper = Identity::parse("0xA11CE00000000000000000000000000000000000").unwrap();
        let seed_upper = derive_seed(b"secret", &upper, SeedContext::Pin).unwrap();
        let seed_lower = derive_seed(b"secret", &alice(), SeedContext::Pin).unwrap();

        assert_eq!(seed_upper.as_bytes(), seed_lower.as_bytes());
    }

    #[test]
    fn rejects_empty_secret() {
        let result = derive_seed(&[], &alice(), SeedContext::Eoa);
        assert!(matches!(result, Err(CryptoError::EmptySecret)));
    }

    #[test]
    fn works_with_large_secret() {
        let large_secret = vec![0xABu8; 1024];
        let seed = derive_seed(&large_secret, &alice(), SeedContext::Eoa).unwrap();
        assert_eq!(seed.as_bytes().len(), SEED_LEN);
    }

    #[test]
    fn salt_carries_protocol_version() {
        let suffix = format!(":v{MEK_VERSION}");
        assert!(HKDF_SALT.ends_with(suffix.as_bytes()));
    }
}
