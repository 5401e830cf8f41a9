//! `mek`: offline inspection of messaging encryption key derivation.
//!
//! Runs the deterministic half of the pipeline locally so operators can check
//! what a client should produce without a wallet, authenticator or directory.
//! Private key material is never printed.
//!
//! # Usage
//!
//! ```bash
//! # Public key and verification hash for a PIN
//! mek derive-pin --identity alice@example.com --pin 847203
//!
//! # Exact message a wallet is asked to sign
//! mek wallet-message --identity 0xabc...
//!
//! # Relying-party id a passkey must be registered under
//! mek rp-id --host https://chat.app.example.com
//!
//! # PRF salt for an identity
//! mek prf-salt --identity alice@example.com
//! ```

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use mek_crypto::{
    CryptoError, DEFAULT_PIN_ITERATIONS, Identity, IdentityError, PinValidationError, SeedContext,
    derive_messaging_key, normalize_rp_id, prf_salt, stretch_pin, validate_pin, verification_hash,
    wallet_message,
};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Messaging encryption key inspection tool
#[derive(Parser, Debug)]
#[command(name = "mek")]
#[command(about = "Inspect messaging encryption key derivation offline")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive the PIN key and print its public half and verification hash
    DerivePin {
        /// Account identity (address, email, or user id)
        #[arg(long)]
        identity: String,

        /// Numeric PIN, at least six digits
        #[arg(long)]
        pin: String,

        /// PBKDF2 rounds
        #[arg(long, default_value_t = DEFAULT_PIN_ITERATIONS)]
        iterations: u32,
    },

    /// Print the message a wallet signs to derive its key
    WalletMessage {
        /// Wallet account
        #[arg(long)]
        identity: String,
    },

    /// Normalize a host or origin to a passkey relying-party id
    RpId {
        /// Host name or origin
        #[arg(long)]
        host: String,
    },

    /// Print the passkey PRF salt for an identity
    PrfSalt {
        /// Account identity
        #[arg(long)]
        identity: String,
    },
}

/// Command failures.
#[derive(Debug, Error)]
enum CliError {
    /// Identity could not be parsed
    #[error("invalid identity: {0}")]
    Identity(#[from] IdentityError),

    /// PIN failed format validation
    #[error("invalid PIN: {0}")]
    Pin(#[from] PinValidationError),

    /// Derivation primitive rejected its input
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Output could not be written
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

fn run(command: Command, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Command::DerivePin { identity, pin, iterations } => {
            let identity = Identity::parse(&identity)?;
            validate_pin(&pin)?;

            tracing::debug!(identity = %identity, iterations, "stretching PIN");
            let secret = stretch_pin(&pin, &identity, iterations)?;
            let key = derive_messaging_key(&secret[..], &identity, SeedContext::Pin)?;
            let public_key = key.public_key();

            writeln!(out, "identity:          {identity}")?;
            writeln!(out, "source:            {}", key.derived_from())?;
            writeln!(out, "public key:        {public_key}")?;
            writeln!(
                out,
                "verification hash: {}",
                hex::encode(verification_hash(&identity, &public_key).as_bytes())
            )?;
        },
        Command::WalletMessage { identity } => {
            let identity = Identity::parse(&identity)?;
            writeln!(out, "{}", wallet_message(&identity))?;
        },
        Command::RpId { host } => {
            writeln!(out, "{}", normalize_rp_id(&host)?)?;
        },
        Command::PrfSalt { identity } => {
            let identity = Identity::parse(&identity)?;
            writeln!(out, "{}", hex::encode(prf_salt(&identity)))?;
        },
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let stdout = io::stdout();
    run(args.command, &mut stdout.lock())?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn output(command: Command) -> String {
        let mut buffer = Vec::new();
        run(command, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "mek",
            "derive-pin",
            "--identity",
            "alice@example.com",
            "--pin",
            "847203",
            "--iterations",
            "1000",
        ])
        .unwrap();

        assert!(matches!(args.command, Command::DerivePin { iterations: 1000, .. }));
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn derive_pin_prints_public_material_only() {
        let text = output(Command::DerivePin {
            identity: "Alice@Example.com".into(),
            pin: "847203".into(),
            iterations: 1_000,
        });

        let identity = Identity::parse("alice@example.com").unwrap();
        let secret = stretch_pin("847203", &identity, 1_000).unwrap();
        let key = derive_messaging_key(&secret[..], &identity, SeedContext::Pin).unwrap();

        assert!(text.contains("identity:          alice@example.com"));
        assert!(text.contains("source:            pin"));
        assert!(text.contains(&key.public_key().to_string()));
        assert!(!text.contains(&hex::encode(key.private_key().as_bytes())));
    }

    #[test]
    fn derive_pin_rejects_short_pin() {
        let mut buffer = Vec::new();
        let result = run(
            Command::DerivePin {
                identity: "alice@example.com".into(),
                pin: "12345".into(),
                iterations: 1_000,
            },
            &mut buffer,
        );

        assert!(matches!(result, Err(CliError::Pin(PinValidationError::TooShort { .. }))));
        assert!(buffer.is_empty());
    }

    #[test]
    fn wallet_message_matches_template() {
        let text = output(Command::WalletMessage { identity: "0xABC".into() });
        let expected = wallet_message(&Identity::parse("0xabc").unwrap());
        assert_eq!(text, format!("{expected}\n"));
    }

    #[test]
    fn rp_id_normalizes_origin() {
        assert_eq!(output(Command::RpId { host: "https://chat.app.example.com:443/x".into() }), "example.com\n");
    }

    #[test]
    fn prf_salt_is_64_hex_chars() {
        let text = output(Command::PrfSalt { identity: "alice@example.com".into() });
        assert_eq!(text.trim_end().len(), 64);
        assert!(text.trim_end().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
