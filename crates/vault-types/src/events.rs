//! Event types emitted by the vault contracts.
//!
//! Contract events are appended to the ledger log as part of the call that
//! produced them and are published on the service event bus once that call
//! commits. A reverted call leaves no events behind.

use crate::api::u256_serde;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all contract events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
	/// Events from the secure vault.
	Vault(VaultEvent),
	/// Events from the authorization manager.
	Manager(ManagerEvent),
}

/// Events emitted by the secure vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
	/// Value was released against a valid authorization.
	Withdrawn {
		recipient: Address,
		#[serde(with = "u256_serde")]
		amount: U256,
	},
}

/// Events emitted by the authorization manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerEvent {
	/// A signer joined the trusted set.
	SignerAdded { signer: Address },
	/// A signer left the trusted set.
	SignerRemoved { signer: Address },
	/// Administration passed to a new owner.
	OwnershipTransferred {
		previous_owner: Address,
		new_owner: Address,
	},
}

/// An event together with the contract address that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
	pub emitter: Address,
	pub event: ContractEvent,
}

impl From<VaultEvent> for ContractEvent {
	fn from(event: VaultEvent) -> Self {
		ContractEvent::Vault(event)
	}
}

impl From<ManagerEvent> for ContractEvent {
	fn from(event: ManagerEvent) -> Self {
		ContractEvent::Manager(event)
	}
}
