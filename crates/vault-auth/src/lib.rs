//! Authorization manager for the secure vault.
//!
//! This module owns the registry of addresses trusted to sign withdrawal
//! authorizations. The vault only ever reads it, through the [`SignerRegistry`]
//! capability; the set itself is mutated exclusively by the manager's owner.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use vault_types::{Address, ManagerEvent};

/// Errors that can occur during authorization manager operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
	/// The signer address is the zero address.
	#[error("Invalid signer address")]
	InvalidSigner,
	/// The owner address is the zero address.
	#[error("Invalid owner address")]
	InvalidOwner,
	/// An administrative call came from someone other than the owner.
	#[error("Caller is not the owner")]
	Unauthorized { caller: Address },
	/// The call would leave the registry without any trusted signer.
	#[error("Cannot remove the last trusted signer")]
	LastSigner,
}

impl AuthError {
	/// True for errors raised while constructing the manager.
	pub fn is_configuration(&self) -> bool {
		matches!(self, AuthError::InvalidSigner | AuthError::InvalidOwner)
	}
}

/// Read-only view of a trusted signer set.
///
/// This is the only surface the vault holds on the manager.
pub trait SignerRegistry: Send + Sync {
	/// Returns true if `address` may sign withdrawal authorizations.
	fn is_trusted_signer(&self, address: &Address) -> bool;
}

#[derive(Debug)]
struct RegistryState {
	owner: Address,
	signers: HashSet<Address>,
}

/// Trusted-signer registry with a single owner.
///
/// Administrative operations are idempotent: adding a present signer or
/// removing an absent one succeeds and returns `None` instead of an event.
#[derive(Debug)]
pub struct AuthorizationManager {
	state: RwLock<RegistryState>,
}

impl AuthorizationManager {
	/// Creates a manager seeded with `initial_signer` and administered by `owner`.
	pub fn new(initial_signer: Address, owner: Address) -> Result<Self, AuthError> {
		if initial_signer == Address::ZERO {
			return Err(AuthError::InvalidSigner);
		}
		if owner == Address::ZERO {
			return Err(AuthError::InvalidOwner);
		}

		tracing::debug!(%initial_signer, %owner, "Authorization manager initialized");
		Ok(Self {
			state: RwLock::new(RegistryState {
				owner,
				signers: HashSet::from([initial_signer]),
			}),
		})
	}

	pub fn owner(&self) -> Address {
		self.read(|state| state.owner)
	}

	/// All trusted signers, sorted for stable output.
	pub fn signers(&self) -> Vec<Address> {
		let mut signers = self.read(|state| state.signers.iter().copied().collect::<Vec<_>>());
		signers.sort_unstable();
		signers
	}

	pub fn signer_count(&self) -> usize {
		self.read(|state| state.signers.len())
	}

	/// Adds `signer` to the trusted set. Owner only.
	pub fn add_signer(
		&self,
		caller: Address,
		signer: Address,
	) -> Result<Option<ManagerEvent>, AuthError> {
		self.write_as_owner(caller, |state| {
			if signer == Address::ZERO {
				return Err(AuthError::InvalidSigner);
			}
			if !state.signers.insert(signer) {
				return Ok(None);
			}
			tracing::info!(%signer, "Trusted signer added");
			Ok(Some(ManagerEvent::SignerAdded { signer }))
		})
	}

	/// Removes `signer` from the trusted set. Owner only.
	pub fn remove_signer(
		&self,
		caller: Address,
		signer: Address,
	) -> Result<Option<ManagerEvent>, AuthError> {
		self.write_as_owner(caller, |state| {
			if !state.signers.contains(&signer) {
				return Ok(None);
			}
			if state.signers.len() == 1 {
				return Err(AuthError::LastSigner);
			}
			state.signers.remove(&signer);
			tracing::info!(%signer, "Trusted signer removed");
			Ok(Some(ManagerEvent::SignerRemoved { signer }))
		})
	}

	/// Hands administration to `new_owner`. Owner only.
	pub fn transfer_ownership(
		&self,
		caller: Address,
		new_owner: Address,
	) -> Result<ManagerEvent, AuthError> {
		self.write_as_owner(caller, |state| {
			if new_owner == Address::ZERO {
				return Err(AuthError::InvalidOwner);
			}
			let previous_owner = state.owner;
			state.owner = new_owner;
			tracing::info!(%previous_owner, %new_owner, "Ownership transferred");
			Ok(ManagerEvent::OwnershipTransferred {
				previous_owner,
				new_owner,
			})
		})
	}

	fn read<R>(&self, f: impl FnOnce(&RegistryState) -> R) -> R {
		let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
		f(&state)
	}

	fn write_as_owner<R>(
		&self,
		caller: Address,
		f: impl FnOnce(&mut RegistryState) -> Result<R, AuthError>,
	) -> Result<R, AuthError> {
		let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
		if caller != state.owner {
			tracing::warn!(%caller, "Rejected administrative call from non-owner");
			return Err(AuthError::Unauthorized { caller });
		}
		f(&mut state)
	}
}

impl SignerRegistry for AuthorizationManager {
	fn is_trusted_signer(&self, address: &Address) -> bool {
		self.read(|state| state.signers.contains(address))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn owner() -> Address {
		Address::repeat_byte(0x0a)
	}

	fn seed() -> Address {
		Address::repeat_byte(0x01)
	}

	fn manager() -> AuthorizationManager {
		AuthorizationManager::new(seed(), owner()).unwrap()
	}

	#[test]
	fn test_seed_signer_is_trusted() {
		let manager = manager();
		assert!(manager.is_trusted_signer(&seed()));
		assert!(!manager.is_trusted_signer(&Address::repeat_byte(0x02)));
		assert!(!manager.is_trusted_signer(&Address::ZERO));
		assert_eq!(manager.owner(), owner());
	}

	#[test]
	fn test_zero_addresses_rejected_at_construction() {
		let err = AuthorizationManager::new(Address::ZERO, owner()).unwrap_err();
		assert_eq!(err, AuthError::InvalidSigner);
		assert!(err.is_configuration());

		let err = AuthorizationManager::new(seed(), Address::ZERO).unwrap_err();
		assert_eq!(err, AuthError::InvalidOwner);
	}

	#[test]
	fn test_add_signer_is_idempotent() {
		let manager = manager();
		let second = Address::repeat_byte(0x02);

		let event = manager.add_signer(owner(), second).unwrap();
		assert_eq!(event, Some(ManagerEvent::SignerAdded { signer: second }));
		assert!(manager.is_trusted_signer(&second));

		assert_eq!(manager.add_signer(owner(), second).unwrap(), None);
		assert_eq!(manager.signer_count(), 2);
	}

	#[test]
	fn test_remove_signer_is_idempotent() {
		let manager = manager();
		let second = Address::repeat_byte(0x02);
		manager.add_signer(owner(), second).unwrap();

		let event = manager.remove_signer(owner(), seed()).unwrap();
		assert_eq!(event, Some(ManagerEvent::SignerRemoved { signer: seed() }));
		assert!(!manager.is_trusted_signer(&seed()));

		assert_eq!(manager.remove_signer(owner(), seed()).unwrap(), None);
		assert_eq!(manager.signers(), vec![second]);
	}

	#[test]
	fn test_last_signer_cannot_be_removed() {
		let manager = manager();
		assert_eq!(
			manager.remove_signer(owner(), seed()),
			Err(AuthError::LastSigner)
		);
		assert!(manager.is_trusted_signer(&seed()));
	}

	#[test]
	fn test_non_owner_is_rejected() {
		let manager = manager();
		let intruder = Address::repeat_byte(0x0b);

		let err = manager.add_signer(intruder, intruder).unwrap_err();
		assert_eq!(err.to_string(), "Caller is not the owner");
		assert!(!manager.is_trusted_signer(&intruder));

		assert!(matches!(
			manager.remove_signer(intruder, seed()),
			Err(AuthError::Unauthorized { .. })
		));
		assert!(matches!(
			manager.transfer_ownership(intruder, intruder),
			Err(AuthError::Unauthorized { .. })
		));
	}

	#[test]
	fn test_owner_check_precedes_argument_checks() {
		let manager = manager();
		let intruder = Address::repeat_byte(0x0b);

		assert_eq!(
			manager.add_signer(intruder, Address::ZERO),
			Err(AuthError::Unauthorized { caller: intruder })
		);
		assert_eq!(
			manager.transfer_ownership(intruder, Address::ZERO),
			Err(AuthError::Unauthorized { caller: intruder })
		);
		assert_eq!(
			manager.add_signer(owner(), Address::ZERO),
			Err(AuthError::InvalidSigner)
		);
		assert_eq!(manager.owner(), owner());
	}

	#[test]
	fn test_ownership_transfer_moves_admin_rights() {
		let manager = manager();
		let new_owner = Address::repeat_byte(0x0c);

		let event = manager.transfer_ownership(owner(), new_owner).unwrap();
		assert_eq!(
			event,
			ManagerEvent::OwnershipTransferred {
				previous_owner: owner(),
				new_owner,
			}
		);

		assert!(manager.add_signer(owner(), Address::repeat_byte(0x03)).is_err());
		assert!(manager.add_signer(new_owner, Address::repeat_byte(0x03)).is_ok());
		assert_eq!(
			manager.transfer_ownership(new_owner, Address::ZERO),
			Err(AuthError::InvalidOwner)
		);
	}
}
