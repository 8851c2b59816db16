//! Native-value ledger the vault contracts execute against.
//!
//! The ledger holds account balances, the contracts deployed on it and the
//! event log. Every balance change and log append is journalled so a call can
//! take a [`Checkpoint`] on entry and roll back to it on failure; nested calls
//! take their own checkpoints inside their caller's, which gives the usual
//! all-or-nothing semantics for re-entrant execution.

use crate::recipient::Recipient;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use vault_auth::SignerRegistry;
use vault_types::{Address, ContractEvent, LogEntry, U256};

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
	/// The source account cannot cover a debit.
	#[error("Insufficient balance for {address}: available {available}, required {required}")]
	InsufficientBalance {
		address: Address,
		available: U256,
		required: U256,
	},
	/// A credit would overflow the account balance.
	#[error("Balance overflow for {0}")]
	BalanceOverflow(Address),
}

/// Position in the journal a call can roll back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

#[derive(Debug)]
enum JournalEntry {
	BalanceChanged {
		address: Address,
		previous: Option<U256>,
	},
	LogAppended,
}

/// In-memory ledger for one chain.
pub struct Ledger {
	chain_id: u64,
	balances: HashMap<Address, U256>,
	deploy_nonces: HashMap<Address, u64>,
	registries: HashMap<Address, Arc<dyn SignerRegistry>>,
	recipients: HashMap<Address, Arc<dyn Recipient>>,
	logs: Vec<LogEntry>,
	journal: Vec<JournalEntry>,
}

impl Ledger {
	pub fn new(chain_id: u64) -> Self {
		Self {
			chain_id,
			balances: HashMap::new(),
			deploy_nonces: HashMap::new(),
			registries: HashMap::new(),
			recipients: HashMap::new(),
			logs: Vec::new(),
			journal: Vec::new(),
		}
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	pub fn balance_of(&self, address: &Address) -> U256 {
		self.balances.get(address).copied().unwrap_or(U256::ZERO)
	}

	/// Credits `amount` to `address` out of thin air. Used for genesis allocations.
	pub fn fund(&mut self, address: Address, amount: U256) -> Result<(), LedgerError> {
		self.credit(address, amount)
	}

	/// Moves `amount` from `from` to `to`.
	///
	/// Transfers are accepted unconditionally by the receiving side; only the
	/// sender's balance can make them fail.
	pub fn transfer_value(
		&mut self,
		from: Address,
		to: Address,
		amount: U256,
	) -> Result<(), LedgerError> {
		self.debit(from, amount)?;
		self.credit(to, amount)
	}

	/// Appends an event to the log.
	pub fn emit(&mut self, emitter: Address, event: impl Into<ContractEvent>) {
		self.logs.push(LogEntry {
			emitter,
			event: event.into(),
		});
		self.journal.push(JournalEntry::LogAppended);
	}

	pub fn logs(&self) -> &[LogEntry] {
		&self.logs
	}

	/// Deploys a signer registry and returns its contract address.
	pub fn deploy_registry(
		&mut self,
		deployer: Address,
		registry: Arc<dyn SignerRegistry>,
	) -> Address {
		let address = self.next_contract_address(deployer);
		self.registries.insert(address, registry);
		address
	}

	pub fn registry_at(&self, address: &Address) -> Option<Arc<dyn SignerRegistry>> {
		self.registries.get(address).cloned()
	}

	/// Attaches code to `address` that runs whenever the vault pays it.
	pub fn register_recipient(&mut self, address: Address, recipient: Arc<dyn Recipient>) {
		self.recipients.insert(address, recipient);
	}

	pub fn recipient_at(&self, address: &Address) -> Option<Arc<dyn Recipient>> {
		self.recipients.get(address).cloned()
	}

	/// CREATE address for the deployer's next deployment.
	pub fn next_contract_address(&mut self, deployer: Address) -> Address {
		let nonce = self.deploy_nonces.entry(deployer).or_insert(0);
		let address = deployer.create(*nonce);
		*nonce += 1;
		address
	}

	pub fn checkpoint(&self) -> Checkpoint {
		Checkpoint(self.journal.len())
	}

	/// Undoes every journalled change made after `checkpoint`.
	pub fn revert_to(&mut self, checkpoint: Checkpoint) {
		while self.journal.len() > checkpoint.0 {
			match self.journal.pop() {
				Some(JournalEntry::BalanceChanged { address, previous }) => match previous {
					Some(balance) => {
						self.balances.insert(address, balance);
					},
					None => {
						self.balances.remove(&address);
					},
				},
				Some(JournalEntry::LogAppended) => {
					self.logs.pop();
				},
				None => break,
			}
		}
	}

	/// Makes all journalled changes permanent.
	pub fn commit(&mut self) {
		self.journal.clear();
	}

	fn credit(&mut self, address: Address, amount: U256) -> Result<(), LedgerError> {
		let current = self.balance_of(&address);
		let updated = current
			.checked_add(amount)
			.ok_or(LedgerError::BalanceOverflow(address))?;
		self.set_balance(address, updated);
		Ok(())
	}

	fn debit(&mut self, address: Address, amount: U256) -> Result<(), LedgerError> {
		let current = self.balance_of(&address);
		let updated = current
			.checked_sub(amount)
			.ok_or(LedgerError::InsufficientBalance {
				address,
				available: current,
				required: amount,
			})?;
		self.set_balance(address, updated);
		Ok(())
	}

	fn set_balance(&mut self, address: Address, balance: U256) {
		let previous = self.balances.insert(address, balance);
		self.journal
			.push(JournalEntry::BalanceChanged { address, previous });
	}
}
