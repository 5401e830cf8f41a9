//! Messaging encryption key acquisition.
//!
//! Turns whatever credential a user already has (a wallet, a passkey, or a
//! PIN) into the one X25519 keypair their identity is established with, and
//! keeps that keypair in a session cache for the life of the process.
//!
//! # Architecture
//!
//! ```text
//!                         ┌──────────────┐
//!   KeyRequest ─────────► │  KeyManager  │ ◄──── SessionKeyCache
//!                         └──────┬───────┘
//!                                │ SourceEvidence (cache, directory, hint)
//!                                ▼
//!                         ┌──────────────┐
//!                         │ SourcePolicy │ ──► [Candidate]
//!                         └──────┬───────┘
//!                                ▼
//!        Wallet │ PasskeyPrf │ PasskeyFallback │ Pin    (adapters)
//!                                ▼
//!                   mek_crypto: seed → keypair
//!                                ▼
//!                        PublicKeyPublisher ──► KeyDirectory
//! ```
//!
//! # Guarantees
//!
//! - The same credential yields the same key on every device, except for
//!   the passkey fallback, which is reported as [`Guarantee::DeviceLocal`].
//! - An identity established as PIN is never routed to another adapter.
//! - Ambiguous or unreadable source state fails closed; no request ever
//!   returns a key different from the established one.
//! - Private keys never leave the process: only public keys are published,
//!   and nothing secret is logged.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod adapters;
mod cache;
mod capability;
mod config;
mod directory;
mod env;
mod error;
mod manager;
mod pin_store;
pub mod policy;
mod publisher;
mod request;

pub use cache::SessionKeyCache;
pub use capability::{AssertionRequest, AssertionResponse, PasskeyAuthenticator, WalletSigner};
pub use config::MekConfig;
pub use directory::{KeyDirectory, MemoryDirectory, RemoteSourceRecord};
pub use env::{Environment, SystemEnv};
pub use error::{AdapterError, CapabilityError, DeriveFailure, DirectoryError, ErrorClass};
pub use manager::KeyManager;
pub use mek_crypto::{DerivedMessagingKey, Identity, KeySource, PublicKey};
pub use pin_store::{MemoryPinRecordStore, PinRecordStore, PinVerificationRecord};
pub use publisher::{PublicKeyPublisher, PublishResult};
pub use request::{AuthType, DerivedKey, Guarantee, KeyOutcome, KeyRequest, PasskeyCredential};
