//! PIN validation, stretching and verification hashes.
//!
//! A PIN has far less entropy than a signature or PRF output, so it is
//! stretched with PBKDF2-HMAC-SHA256 before entering the common seed
//! derivation. The stretched bytes are then treated like any other raw
//! credential secret (see [`crate::derive_seed`] with
//! [`crate::SeedContext::Pin`]).
//!
//! The verification hash binds `(label, identity, public key)`. It never
//! covers the PIN directly: checking a guess against it requires running the
//! full derivation to reach the public key.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    error::{CryptoError, PinValidationError},
    identity::Identity,
    keypair::PublicKey,
};

type HmacSha256 = Hmac<Sha256>;

/// Minimum number of digits in a PIN.
pub const MIN_PIN_LENGTH: usize = 6;

/// PBKDF2 rounds. Roughly 100ms per guess on commodity hardware.
pub const DEFAULT_PIN_ITERATIONS: u32 = 600_000;

/// Prefix of the per-identity PBKDF2 salt.
const PIN_SALT_LABEL: &str = "mek-pin-salt:v1";

/// HMAC key for verification hashes.
const PIN_VERIFY_LABEL: &[u8] = b"mek-pin-verify:v1";

/// Check PIN format. Runs before any cryptographic work.
///
/// # Errors
///
/// - `PinValidationError::NonNumeric` if any character is not an ASCII digit
/// - `PinValidationError::TooShort` if fewer than [`MIN_PIN_LENGTH`] digits
pub fn validate_pin(pin: &str) -> Result<(), PinValidationError> {
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(PinValidationError::NonNumeric);
    }
    if pin.len() < MIN_PIN_LENGTH {
        return Err(PinValidationError::TooShort { min: MIN_PIN_LENGTH, actual: pin.len() });
    }
    Ok(())
}

/// Stretch a PIN into 32 bytes of secret material.
///
/// Callers must run [`validate_pin`] first; this function only guards against
/// a zero round count.
pub fn stretch_pin(
    pin: &str,
    identity: &Identity,
    iterations: u32,
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::InvalidIterations);
    }

    let salt = format!("{PIN_SALT_LABEL}:{}", identity.as_str());
    let mut output = Zeroizing::new([0u8; 32]);
    pbkdf2::pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt.as_bytes(), iterations, &mut output[..]);

    Ok(output)
}

/// Local proof that a PIN was accepted for an identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerificationHash([u8; 32]);

impl VerificationHash {
    /// Wrap stored hash bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for VerificationHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationHash(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "…)")
    }
}

/// Verification hash for the public key a PIN produced.
pub fn verification_hash(identity: &Identity, public_key: &PublicKey) -> VerificationHash {
    let Ok(mut mac) = HmacSha256::new_from_slice(PIN_VERIFY_LABEL) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac.update(identity.as_str().as_bytes());
    mac.update(b":");
    mac.update(public_key.as_bytes());

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&mac.finalize().into_bytes());
    VerificationHash(hash)
}
