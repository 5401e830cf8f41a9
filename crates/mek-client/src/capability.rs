//! External capabilities invoked by the credential adapters.
//!
//! Both are opaque: a wallet that can sign a message, and a platform
//! authenticator that can produce passkey assertions. Calls may suspend on
//! user interaction for as long as the user needs; no timeout is applied
//! here.

use async_trait::async_trait;

use crate::error::CapabilityError;

/// Wallet that signs human-readable messages (e.g. EIP-191 `personal_sign`).
///
/// The signature scheme must be deterministic for a given account and
/// message, otherwise the wallet path cannot reproduce keys.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Sign `message` with `account`.
    async fn sign_message(&self, account: &str, message: &str)
    -> Result<Vec<u8>, CapabilityError>;
}

/// Passkey assertion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRequest {
    /// Credential to assert with.
    pub credential_id: Vec<u8>,
    /// Normalized relying-party id.
    pub rp_id: String,
    /// PRF evaluation input. `None` requests a plain assertion.
    pub prf_salt: Option<[u8; 32]>,
}

/// Passkey assertion result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResponse {
    /// PRF output, present only if the authenticator evaluated the extension.
    pub prf_output: Option<Vec<u8>>,
}

/// Platform authenticator (WebAuthn or native passkey API).
#[async_trait]
pub trait PasskeyAuthenticator: Send + Sync {
    /// Perform a user-verified assertion.
    async fn get_assertion(
        &self,
        request: AssertionRequest,
    ) -> Result<AssertionResponse, CapabilityError>;
}
