//! Passkey PRF salt, PRF output normalization and relying-party ids.

use std::net::Ipv4Addr;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{error::CryptoError, identity::Identity};

/// Prefix of the per-identity PRF evaluation salt.
const PRF_SALT_LABEL: &str = "mek-passkey-prf:v1";

/// Fixed salt the authenticator's PRF is evaluated on for an identity.
pub fn prf_salt(identity: &Identity) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PRF_SALT_LABEL.as_bytes());
    hasher.update(b":");
    hasher.update(identity.as_str().as_bytes());
    hasher.finalize().into()
}

/// Bring PRF output to exactly 32 bytes.
///
/// 32-byte output is used as-is; any other length is hashed with SHA-256.
pub fn normalize_prf_output(output: &[u8]) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    if output.is_empty() {
        return Err(CryptoError::EmptySecret);
    }

    let mut normalized = Zeroizing::new([0u8; 32]);
    if output.len() == 32 {
        normalized.copy_from_slice(output);
    } else {
        normalized.copy_from_slice(&Sha256::digest(output));
    }
    Ok(normalized)
}

/// Reduce a host (or origin) to the relying-party id used for passkeys.
///
/// Strips scheme, path, userinfo, port and trailing dot, lowercases, and
/// keeps only the registrable domain (`chat.app.example.com` → `example.com`,
/// `eu.app.example.co.uk` → `example.co.uk`) per the public suffix list.
/// IP literals and single-label hosts such as `localhost` pass through; a
/// host that is itself a public suffix (`github.io`) is rejected.
/// Registration and every later assertion must go through this same
/// function.
pub fn normalize_rp_id(input: &str) -> Result<String, CryptoError> {
    let invalid = || CryptoError::InvalidRelyingPartyId { input: input.to_string() };

    let mut host = input.trim().to_ascii_lowercase();
    if let Some((_, rest)) = host.split_once("://") {
        host = rest.to_string();
    }
    if let Some(end) = host.find(['/', '?', '#']) {
        host.truncate(end);
    }
    if let Some((_, rest)) = host.rsplit_once('@') {
        host = rest.to_string();
    }

    if host.starts_with('[') {
        let end = host.find(']').ok_or_else(invalid)?;
        return Ok(host[..=end].to_string());
    }

    if let Some((name, port)) = host.rsplit_once(':') {
        if !port.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        host = name.to_string();
    }

    let host = host.trim_end_matches('.');
    if host.is_empty() {
        return Err(invalid());
    }
    if host.parse::<Ipv4Addr>().is_ok() {
        return Ok(host.to_string());
    }

    let labels: Vec<&str> = host.split('.').collect();
    let well_formed = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !well_formed {
        return Err(invalid());
    }

    if labels.len() == 1 {
        return Ok(host.to_string());
    }

    psl::domain_str(host).map(str::to_string).ok_or_else(invalid)
}
