//! Serialised access to a deployed vault.
//!
//! `VaultService` owns the ledger and the vault behind one async mutex. Every
//! state-changing operation holds the lock from start to finish, so calls never
//! interleave: two submissions of the same authorization are processed one
//! after the other and the second sees the nonce consumed. Journals are
//! committed when the outermost call returns successfully, and the events it
//! produced are then published on the [`EventBus`].
//!
//! Deposits arriving from outside the process must carry the depositor's own
//! signature; see [`VaultService::deposit_signed`].

use crate::event_bus::EventBus;
use crate::ledger::{Ledger, LedgerError};
use crate::recipient::Recipient;
use crate::vault::{recover_signer, SecureVault, VaultError};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use vault_auth::{AuthError, AuthorizationManager, SignerRegistry};
use vault_types::{
	Address, AuthorizationMessage, DepositAuthorization, DepositRequest, LogEntry, ManagerEvent,
	VaultStatusResponse, WithdrawReceipt, WithdrawRequest, U256,
};

const EVENT_BUS_CAPACITY: usize = 1000;

struct VaultRuntime {
	ledger: Ledger,
	vault: SecureVault,
	/// `(from, nonce)` pairs of signed deposits already processed.
	deposit_nonces: HashSet<(Address, U256)>,
}

impl VaultRuntime {
	fn commit(&mut self) {
		self.ledger.commit();
		self.vault.commit();
	}
}

/// Entry point for every operation on a deployed vault.
pub struct VaultService {
	runtime: Mutex<VaultRuntime>,
	manager: Arc<AuthorizationManager>,
	event_bus: EventBus,
	vault_address: Address,
	manager_address: Address,
	chain_id: u64,
}

impl VaultService {
	pub fn new(ledger: Ledger, vault: SecureVault, manager: Arc<AuthorizationManager>) -> Self {
		let vault_address = vault.address();
		let manager_address = vault.manager_address();
		let chain_id = ledger.chain_id();
		Self {
			runtime: Mutex::new(VaultRuntime {
				ledger,
				vault,
				deposit_nonces: HashSet::new(),
			}),
			manager,
			event_bus: EventBus::new(EVENT_BUS_CAPACITY),
			vault_address,
			manager_address,
			chain_id,
		}
	}

	pub fn vault_address(&self) -> Address {
		self.vault_address
	}

	pub fn manager_address(&self) -> Address {
		self.manager_address
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn manager(&self) -> &AuthorizationManager {
		&self.manager
	}

	/// Sends `amount` from `from` to the vault. Returns the new vault balance.
	///
	/// `from` is not authenticated here; the caller must already act for it.
	pub async fn deposit(&self, from: Address, amount: U256) -> Result<U256, LedgerError> {
		let mut runtime = self.runtime.lock().await;
		self.transfer_in(&mut runtime, from, amount)
	}

	/// Sends a deposit signed by its source account. Returns the new vault balance.
	///
	/// The signature must recover to `request.from` over the deposit
	/// authorization for this vault and chain, and each `(from, nonce)` pair is
	/// accepted once.
	pub async fn deposit_signed(&self, request: &DepositRequest) -> Result<U256, VaultError> {
		let authorization = DepositAuthorization::new(
			self.vault_address,
			request.from,
			request.amount,
			request.nonce,
			self.chain_id,
		);
		let signer = recover_signer(&request.signature, &authorization.signing_digest())?;
		if signer != request.from {
			tracing::warn!(from = %request.from, %signer, "Deposit signature does not match source");
			return Err(VaultError::InvalidSignature);
		}

		let mut runtime = self.runtime.lock().await;
		if runtime.deposit_nonces.contains(&(request.from, request.nonce)) {
			return Err(VaultError::AlreadyConsumed);
		}
		let balance = self.transfer_in(&mut runtime, request.from, request.amount)?;
		runtime.deposit_nonces.insert((request.from, request.nonce));
		Ok(balance)
	}

	fn transfer_in(
		&self,
		runtime: &mut VaultRuntime,
		from: Address,
		amount: U256,
	) -> Result<U256, LedgerError> {
		let checkpoint = runtime.ledger.checkpoint();
		if let Err(e) = runtime
			.ledger
			.transfer_value(from, self.vault_address, amount)
		{
			runtime.ledger.revert_to(checkpoint);
			tracing::warn!(%from, %amount, "Deposit rejected: {}", e);
			return Err(e);
		}
		runtime.commit();

		let balance = runtime.ledger.balance_of(&self.vault_address);
		tracing::info!(%from, %amount, %balance, "Deposit received");
		Ok(balance)
	}

	/// Credits an account directly, e.g. to seed test accounts.
	pub async fn fund(&self, address: Address, amount: U256) -> Result<(), LedgerError> {
		let mut runtime = self.runtime.lock().await;
		runtime.ledger.fund(address, amount)?;
		runtime.commit();
		Ok(())
	}

	/// Submits a signed withdrawal.
	pub async fn withdraw(&self, request: &WithdrawRequest) -> Result<WithdrawReceipt, VaultError> {
		let mut runtime = self.runtime.lock().await;
		let log_start = runtime.ledger.logs().len();

		let VaultRuntime { ledger, vault, .. } = &mut *runtime;
		let receipt = vault.withdraw(
			ledger,
			request.recipient,
			request.amount,
			request.nonce,
			&request.signature,
		)?;

		runtime.commit();
		for entry in &runtime.ledger.logs()[log_start..] {
			self.event_bus.publish(entry.event.clone());
		}
		Ok(receipt)
	}

	pub fn is_trusted_signer(&self, address: &Address) -> bool {
		self.manager.is_trusted_signer(address)
	}

	/// Adds a trusted signer. Returns whether the set changed.
	pub async fn add_signer(&self, caller: Address, signer: Address) -> Result<bool, AuthError> {
		let mut runtime = self.runtime.lock().await;
		let event = self.manager.add_signer(caller, signer)?;
		Ok(self.record_manager_event(&mut runtime, event))
	}

	/// Removes a trusted signer. Returns whether the set changed.
	pub async fn remove_signer(&self, caller: Address, signer: Address) -> Result<bool, AuthError> {
		let mut runtime = self.runtime.lock().await;
		let event = self.manager.remove_signer(caller, signer)?;
		Ok(self.record_manager_event(&mut runtime, event))
	}

	pub async fn transfer_ownership(
		&self,
		caller: Address,
		new_owner: Address,
	) -> Result<(), AuthError> {
		let mut runtime = self.runtime.lock().await;
		let event = self.manager.transfer_ownership(caller, new_owner)?;
		self.record_manager_event(&mut runtime, Some(event));
		Ok(())
	}

	/// Attaches recipient code to `address`.
	pub async fn register_recipient(&self, address: Address, recipient: Arc<dyn Recipient>) {
		let mut runtime = self.runtime.lock().await;
		runtime.ledger.register_recipient(address, recipient);
	}

	pub async fn balance(&self) -> U256 {
		let runtime = self.runtime.lock().await;
		runtime.vault.balance(&runtime.ledger)
	}

	pub async fn balance_of(&self, address: &Address) -> U256 {
		let runtime = self.runtime.lock().await;
		runtime.ledger.balance_of(address)
	}

	pub async fn is_consumed(&self, nonce: &U256) -> bool {
		let runtime = self.runtime.lock().await;
		runtime.vault.is_consumed(nonce)
	}

	/// The message a signer must sign to authorize this withdrawal on this vault.
	pub fn authorization_message(
		&self,
		recipient: Address,
		amount: U256,
		nonce: U256,
	) -> AuthorizationMessage {
		AuthorizationMessage::new(self.vault_address, recipient, amount, nonce, self.chain_id)
	}

	pub async fn status(&self) -> VaultStatusResponse {
		let runtime = self.runtime.lock().await;
		VaultStatusResponse {
			vault: self.vault_address,
			authorization_manager: self.manager_address,
			chain_id: self.chain_id,
			balance: runtime.vault.balance(&runtime.ledger),
			consumed_authorizations: runtime.vault.consumed_count(),
		}
	}

	/// Snapshot of the committed event log.
	pub async fn logs(&self) -> Vec<LogEntry> {
		let runtime = self.runtime.lock().await;
		runtime.ledger.logs().to_vec()
	}

	fn record_manager_event(&self, runtime: &mut VaultRuntime, event: Option<ManagerEvent>) -> bool {
		let Some(event) = event else {
			return false;
		};
		runtime.ledger.emit(self.manager_address, event.clone());
		runtime.commit();
		self.event_bus.publish(event.into());
		true
	}
}
