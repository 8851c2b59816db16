//! Secure vault contract.
//!
//! The vault holds native value and releases it only against an authorization
//! signed by a trusted signer. Each authorization carries a nonce that can be
//! consumed once; the nonce is marked before any value leaves the vault, and
//! the recipient's code (if any) runs last, so a re-entrant call made from that
//! code sees the authorization as already spent.

mod nonces;
mod signature;

pub use nonces::{NonceBook, NonceCheckpoint};
pub use signature::recover_signer;

use crate::ledger::{Ledger, LedgerError};
use crate::recipient::VaultCall;
use std::sync::Arc;
use thiserror::Error;
use vault_auth::SignerRegistry;
use vault_types::{Address, AuthorizationMessage, VaultEvent, WithdrawReceipt, U256};

/// Errors that can occur during vault operations.
///
/// The `Display` text of each variant is the stable reason reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
	/// A constructor argument is unusable.
	#[error("Invalid configuration: {0}")]
	Configuration(String),
	/// The recipient is the zero address.
	#[error("Invalid recipient")]
	InvalidRecipient,
	/// The amount is zero.
	#[error("Invalid amount")]
	InvalidAmount,
	/// The signature bytes are not a canonical recoverable signature.
	#[error("Malformed authorization signature")]
	MalformedSignature { reason: String },
	/// The signature does not come from a trusted signer.
	#[error("Invalid authorization signature")]
	InvalidSignature,
	/// The nonce has already been spent.
	#[error("Authorization already consumed")]
	AlreadyConsumed,
	/// The vault holds less than the requested amount.
	#[error("Insufficient vault balance")]
	InsufficientFunds { available: U256, requested: U256 },
	/// The recipient's code rejected the payment.
	#[error("Transfer failed: {0}")]
	TransferFailed(String),
	/// The ledger refused a balance update.
	#[error("Ledger error: {0}")]
	Ledger(#[from] LedgerError),
}

impl VaultError {
	/// Stable machine-readable code for this error.
	pub fn kind(&self) -> &'static str {
		match self {
			VaultError::Configuration(_) => "INVALID_CONFIGURATION",
			VaultError::InvalidRecipient => "INVALID_RECIPIENT",
			VaultError::InvalidAmount => "INVALID_AMOUNT",
			VaultError::MalformedSignature { .. } => "MALFORMED_SIGNATURE",
			VaultError::InvalidSignature => "INVALID_SIGNATURE",
			VaultError::AlreadyConsumed => "AUTHORIZATION_CONSUMED",
			VaultError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
			VaultError::TransferFailed(_) => "TRANSFER_FAILED",
			VaultError::Ledger(_) => "LEDGER_ERROR",
		}
	}
}

/// Vault contract state.
pub struct SecureVault {
	address: Address,
	manager_address: Address,
	manager: Arc<dyn SignerRegistry>,
	nonces: NonceBook,
	/// Number of `withdraw` frames currently executing.
	depth: usize,
}

impl SecureVault {
	/// Deploys a vault bound to the signer registry at `manager_address`.
	///
	/// The registry reference is fixed for the lifetime of the vault.
	pub fn deploy(
		ledger: &mut Ledger,
		deployer: Address,
		manager_address: Address,
	) -> Result<Self, VaultError> {
		if manager_address == Address::ZERO {
			return Err(VaultError::Configuration(
				"authorization manager address is zero".to_string(),
			));
		}
		let manager = ledger.registry_at(&manager_address).ok_or_else(|| {
			VaultError::Configuration(format!(
				"no authorization manager deployed at {}",
				manager_address
			))
		})?;

		let address = ledger.next_contract_address(deployer);
		tracing::info!(vault = %address, manager = %manager_address, "Vault deployed");

		Ok(Self {
			address,
			manager_address,
			manager,
			nonces: NonceBook::new(),
			depth: 0,
		})
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn manager_address(&self) -> Address {
		self.manager_address
	}

	pub fn balance(&self, ledger: &Ledger) -> U256 {
		ledger.balance_of(&self.address)
	}

	pub fn is_consumed(&self, nonce: &U256) -> bool {
		self.nonces.is_consumed(nonce)
	}

	pub fn consumed_count(&self) -> usize {
		self.nonces.len()
	}

	/// Builds the message this vault expects to be signed on `ledger`'s chain.
	pub fn authorization_message(
		&self,
		ledger: &Ledger,
		recipient: Address,
		amount: U256,
		nonce: U256,
	) -> AuthorizationMessage {
		AuthorizationMessage::new(self.address, recipient, amount, nonce, ledger.chain_id())
	}

	/// Releases `amount` to `recipient` against a signed authorization.
	///
	/// On error every change made by this call, including changes made by
	/// nested calls from recipient code, is rolled back. When the outermost
	/// call succeeds, the ledger and nonce journals are committed.
	pub fn withdraw(
		&mut self,
		ledger: &mut Ledger,
		recipient: Address,
		amount: U256,
		nonce: U256,
		signature: &[u8],
	) -> Result<WithdrawReceipt, VaultError> {
		let ledger_checkpoint = ledger.checkpoint();
		let nonce_checkpoint = self.nonces.checkpoint();

		self.depth += 1;
		let result = self.execute_withdraw(ledger, recipient, amount, nonce, signature);
		self.depth -= 1;

		match &result {
			Err(e) => {
				ledger.revert_to(ledger_checkpoint);
				self.nonces.revert_to(nonce_checkpoint);
				tracing::warn!(%recipient, %nonce, kind = e.kind(), "Withdrawal rejected: {}", e);
			},
			Ok(_) if self.depth == 0 => {
				ledger.commit();
				self.commit();
			},
			Ok(_) => {},
		}
		result
	}

	/// Makes consumed nonces permanent.
	pub fn commit(&mut self) {
		self.nonces.commit();
	}

	fn execute_withdraw(
		&mut self,
		ledger: &mut Ledger,
		recipient: Address,
		amount: U256,
		nonce: U256,
		signature: &[u8],
	) -> Result<WithdrawReceipt, VaultError> {
		if recipient == Address::ZERO {
			return Err(VaultError::InvalidRecipient);
		}
		if amount.is_zero() {
			return Err(VaultError::InvalidAmount);
		}

		// Checks
		let message = self.authorization_message(ledger, recipient, amount, nonce);
		let digest = message.signing_digest();
		tracing::debug!(hash = %message.hash(), %digest, "Verifying authorization");

		let signer = recover_signer(signature, &digest)?;
		if !self.manager.is_trusted_signer(&signer) {
			return Err(VaultError::InvalidSignature);
		}
		if self.nonces.is_consumed(&nonce) {
			return Err(VaultError::AlreadyConsumed);
		}
		let available = ledger.balance_of(&self.address);
		if available < amount {
			return Err(VaultError::InsufficientFunds {
				available,
				requested: amount,
			});
		}

		// Effects
		self.nonces.consume(nonce);
		ledger.transfer_value(self.address, recipient, amount)?;

		// Interactions
		if let Some(code) = ledger.recipient_at(&recipient) {
			let from = self.address;
			let mut call = VaultCall::new(self, ledger);
			code.on_value_received(&mut call, from, amount)
				.map_err(VaultError::TransferFailed)?;
		}

		ledger.emit(self.address, VaultEvent::Withdrawn { recipient, amount });
		tracing::info!(%recipient, %amount, %nonce, %signer, "Withdrawal executed");

		Ok(WithdrawReceipt {
			vault: self.address,
			recipient,
			amount,
			nonce,
			signer,
			authorization_hash: message.hash(),
			remaining_balance: ledger.balance_of(&self.address),
		})
	}
}
