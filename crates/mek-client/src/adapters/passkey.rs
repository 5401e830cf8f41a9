//! Passkey adapters: PRF (deterministic) and fallback (device-local).

use mek_crypto::{
    DerivedMessagingKey, Identity, SeedContext, derive_messaging_key, normalize_prf_output,
    normalize_rp_id, prf_salt,
};
use zeroize::Zeroizing;

use crate::{
    capability::{AssertionRequest, PasskeyAuthenticator},
    env::Environment,
    error::AdapterError,
};

/// Credential and relying party shared by both passkey paths.
struct PasskeyTarget<'a> {
    authenticator: &'a dyn PasskeyAuthenticator,
    credential_id: &'a [u8],
    rp_id: String,
}

impl<'a> PasskeyTarget<'a> {
    fn new(
        authenticator: &'a dyn PasskeyAuthenticator,
        credential_id: &'a [u8],
        relying_party_id: &str,
    ) -> Result<Self, AdapterError> {
        if credential_id.is_empty() {
            return Err(AdapterError::Unavailable { reason: "no passkey credential".into() });
        }
        let rp_id = normalize_rp_id(relying_party_id)?;
        Ok(Self { authenticator, credential_id, rp_id })
    }

    fn request(&self, prf_salt: Option<[u8; 32]>) -> AssertionRequest {
        AssertionRequest {
            credential_id: self.credential_id.to_vec(),
            rp_id: self.rp_id.clone(),
            prf_salt,
        }
    }
}

/// Derives key material from the WebAuthn PRF extension.
///
/// The PRF is evaluated on a fixed per-identity salt, so the same passkey
/// yields the same secret on every device it syncs to.
pub struct PasskeyPrfAdapter<'a> {
    target: PasskeyTarget<'a>,
}

impl<'a> PasskeyPrfAdapter<'a> {
    /// Bind an authenticator to a credential and relying party.
    ///
    /// # Errors
    ///
    /// - `AdapterError::Unavailable` if `credential_id` is empty
    /// - `AdapterError::Crypto` if the relying-party id is malformed
    pub fn new(
        authenticator: &'a dyn PasskeyAuthenticator,
        credential_id: &'a [u8],
        relying_party_id: &str,
    ) -> Result<Self, AdapterError> {
        Ok(Self { target: PasskeyTarget::new(authenticator, credential_id, relying_party_id)? })
    }

    /// Normalized relying-party id used for every assertion.
    pub fn rp_id(&self) -> &str {
        &self.target.rp_id
    }

    /// Assert with PRF and return the normalized 32-byte output.
    ///
    /// # Errors
    ///
    /// - `AdapterError::Cancelled` if the user dismisses the prompt
    /// - `AdapterError::PrfNotSupported` if the assertion carried no PRF result
    pub async fn derive_secret(
        &self,
        identity: &Identity,
    ) -> Result<Zeroizing<[u8; 32]>, AdapterError> {
        let request = self.target.request(Some(prf_salt(identity)));
        let response = self.target.authenticator.get_assertion(request).await?;

        let Some(output) = response.prf_output else {
            return Err(AdapterError::PrfNotSupported);
        };
        let output = Zeroizing::new(output);
        Ok(normalize_prf_output(&output)?)
    }

    /// Full PRF path: PRF output → seed → keypair.
    pub async fn derive_key(&self, identity: &Identity) -> Result<DerivedMessagingKey, AdapterError> {
        let secret = self.derive_secret(identity).await?;
        Ok(derive_messaging_key(&secret[..], identity, SeedContext::PasskeyPrf)?)
    }
}

/// Authenticates with a plain assertion, then uses local randomness.
///
/// The resulting key is not reproducible on any other device. It exists only
/// for authenticators without PRF, and only when the caller asks for it.
pub struct PasskeyFallbackAdapter<'a, E: Environment> {
    target: PasskeyTarget<'a>,
    env: &'a E,
}

impl<'a, E: Environment> PasskeyFallbackAdapter<'a, E> {
    /// Bind an authenticator to a credential, relying party and entropy source.
    pub fn new(
        authenticator: &'a dyn PasskeyAuthenticator,
        credential_id: &'a [u8],
        relying_party_id: &str,
        env: &'a E,
    ) -> Result<Self, AdapterError> {
        Ok(Self { target: PasskeyTarget::new(authenticator, credential_id, relying_party_id)?, env })
    }

    /// Gate on a user-verified assertion, then draw 32 random bytes.
    pub async fn derive_secret(
        &self,
        identity: &Identity,
    ) -> Result<Zeroizing<[u8; 32]>, AdapterError> {
        self.target.authenticator.get_assertion(self.target.request(None)).await?;

        tracing::warn!(identity = %identity, "deriving device-local passkey fallback key");

        let mut secret = Zeroizing::new([0u8; 32]);
        self.env.random_bytes(&mut secret[..]);
        Ok(secret)
    }

    /// Full fallback path: random secret → seed → keypair.
    pub async fn derive_key(&self, identity: &Identity) -> Result<DerivedMessagingKey, AdapterError> {
        let secret = self.derive_secret(identity).await?;
        Ok(derive_messaging_key(&secret[..], identity, SeedContext::PasskeyFallback)?)
    }
}
