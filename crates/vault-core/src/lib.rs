//! Core of the signature-authorized vault.
//!
//! This crate holds the ledger the contracts execute against, the vault
//! contract itself, the recipient callback used for re-entrant calls and the
//! [`VaultService`] that serialises access to a deployed vault. The
//! [`VaultBuilder`] deploys the authorization manager and the vault from a
//! [`vault_config::Config`].

pub mod builder;
pub mod event_bus;
pub mod ledger;
pub mod recipient;
pub mod service;
pub mod vault;

pub use builder::{BuilderError, VaultBuilder};
pub use event_bus::EventBus;
pub use ledger::{Checkpoint, Ledger, LedgerError};
pub use recipient::{Recipient, VaultCall};
pub use service::VaultService;
pub use vault::{recover_signer, NonceBook, SecureVault, VaultError};
