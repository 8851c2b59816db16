//! Recipient code executed when the vault pays an address.
//!
//! A [`Recipient`] registered on the ledger runs after the vault has consumed
//! the nonce and moved the value. It receives a [`VaultCall`] through which it
//! can call back into the vault, which is how re-entrant withdrawals are
//! expressed. Returning an error makes the paying withdrawal fail and roll back.

use crate::ledger::Ledger;
use crate::vault::{SecureVault, VaultError};
use vault_types::{Address, WithdrawReceipt, U256};

/// Code attached to an address that reacts to incoming vault payments.
pub trait Recipient: Send + Sync {
	/// Called once per payment. `from` is the paying vault.
	fn on_value_received(
		&self,
		call: &mut VaultCall<'_>,
		from: Address,
		amount: U256,
	) -> Result<(), String>;
}

/// Handle on the paying vault, valid for the duration of a payment callback.
pub struct VaultCall<'a> {
	vault: &'a mut SecureVault,
	ledger: &'a mut Ledger,
}

impl<'a> VaultCall<'a> {
	pub(crate) fn new(vault: &'a mut SecureVault, ledger: &'a mut Ledger) -> Self {
		Self { vault, ledger }
	}

	pub fn vault_address(&self) -> Address {
		self.vault.address()
	}

	pub fn balance_of(&self, address: &Address) -> U256 {
		self.ledger.balance_of(address)
	}

	pub fn is_consumed(&self, nonce: &U256) -> bool {
		self.vault.is_consumed(nonce)
	}

	/// Re-enters the paying vault's `withdraw`.
	pub fn withdraw(
		&mut self,
		recipient: Address,
		amount: U256,
		nonce: U256,
		signature: &[u8],
	) -> Result<WithdrawReceipt, VaultError> {
		self.vault
			.withdraw(self.ledger, recipient, amount, nonce, signature)
	}
}
