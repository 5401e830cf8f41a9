//! Wallet signature message template.
//!
//! The wallet path signs one fixed message and uses the signature bytes as
//! the credential secret. Every byte of the message feeds the derived key:
//! editing the template, the domain, or [`MEK_VERSION`] changes every
//! wallet-derived key for every user.

use crate::identity::Identity;

/// Protocol version of the derivation scheme.
pub const MEK_VERSION: u32 = 1;

/// Domain named in the wallet message.
pub const APP_DOMAIN: &str = "mek.chat";

/// Exact message the wallet is asked to sign.
pub fn wallet_message(identity: &Identity) -> String {
    format!(
        "{APP_DOMAIN} wants you to unlock end-to-end encrypted messaging.\n\
         \n\
         Purpose: derive your Messaging Encryption Key\n\
         Account: {identity}\n\
         Version: {MEK_VERSION}\n\
         \n\
         This signature does not authorize any transaction and costs no gas."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_byte_stable() {
        let identity = Identity::parse("0xABC0000000000000000000000000000000000001").unwrap();

        let expected = "mek.chat wants you to unlock end-to-end encrypted messaging.\n\
                        \n\
                        Purpose: derive your Messaging Encryption Key\n\
                        Account: 0xabc0000000000000000000000000000000000001\n\
                        Version: 1\n\
                        \n\
                        This signature does not authorize any transaction and costs no gas.";

        assert_eq!(wallet_message(&identity), expected);
    }

    #[test]
    fn template_uses_normalized_identity() {
        let upper = Identity::parse("0xDEF").unwrap();
        let lower = Identity::parse("0xdef").unwrap();
        assert_eq!(wallet_message(&upper), wallet_message(&lower));
    }
}
