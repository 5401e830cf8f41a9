//! Wallet signature adapter.

use mek_crypto::{DerivedMessagingKey, Identity, SeedContext, derive_messaging_key, wallet_message};
use zeroize::Zeroizing;

use crate::{capability::WalletSigner, error::AdapterError};

/// Derives key material from a wallet signature over the fixed MEK message.
pub struct WalletSignatureAdapter<'a> {
    signer: &'a dyn WalletSigner,
}

impl<'a> WalletSignatureAdapter<'a> {
    /// Wrap a wallet signing capability.
    pub fn new(signer: &'a dyn WalletSigner) -> Self {
        Self { signer }
    }

    /// Ask the wallet to sign the MEK message. The signature is the secret.
    ///
    /// # Errors
    ///
    /// - `AdapterError::Cancelled` if the user rejects the prompt
    /// - `AdapterError::Unavailable` if no wallet can sign
    pub async fn derive_secret(
        &self,
        identity: &Identity,
    ) -> Result<Zeroizing<Vec<u8>>, AdapterError> {
        let message = wallet_message(identity);
        let signature = self.signer.sign_message(identity.as_str(), &message).await?;
        Ok(Zeroizing::new(signature))
    }

    /// Full wallet path: signature → seed → keypair.
    pub async fn derive_key(&self, identity: &Identity) -> Result<DerivedMessagingKey, AdapterError> {
        let secret = self.derive_secret(identity).await?;
        Ok(derive_messaging_key(&secret, identity, SeedContext::Eoa)?)
    }
}
