//! Deployment of the authorization manager and the vault from configuration.
//!
//! The builder creates a fresh ledger, credits the genesis accounts, deploys
//! the manager owned by the configured deployer, deploys the vault bound to
//! that manager and finally moves the optional initial deposit into the vault.

use crate::ledger::{Ledger, LedgerError};
use crate::service::VaultService;
use crate::vault::{SecureVault, VaultError};
use std::sync::Arc;
use thiserror::Error;
use vault_auth::{AuthError, AuthorizationManager};
use vault_config::Config;
use vault_types::Address;

/// Errors that can occur while deploying a vault.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Authorization manager deployment failed: {0}")]
	Auth(#[from] AuthError),
	#[error("Vault deployment failed: {0}")]
	Vault(#[from] VaultError),
	#[error("Ledger error: {0}")]
	Ledger(#[from] LedgerError),
}

/// Builder for a deployed [`VaultService`].
pub struct VaultBuilder {
	config: Config,
	default_signer: Option<Address>,
}

impl VaultBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			default_signer: None,
		}
	}

	/// Trusted signer used when the configuration names none, normally the
	/// address of the configured off-chain signer.
	pub fn with_default_signer(mut self, signer: Address) -> Self {
		self.default_signer = Some(signer);
		self
	}

	pub fn build(self) -> Result<VaultService, BuilderError> {
		let vault_config = &self.config.vault;
		let deployer = vault_config.deployer;

		let mut ledger = Ledger::new(vault_config.chain_id);
		for account in &self.config.genesis {
			ledger.fund(account.address, account.balance)?;
		}

		let initial_signer = vault_config
			.initial_signer
			.or(self.default_signer)
			.ok_or_else(|| {
				BuilderError::Config(
					"no initial signer configured and no default signer provided".into(),
				)
			})?;

		let manager = Arc::new(AuthorizationManager::new(initial_signer, deployer)?);
		let manager_address = ledger.deploy_registry(deployer, manager.clone());
		let vault = SecureVault::deploy(&mut ledger, deployer, manager_address)?;

		if let Some(deposit) = vault_config.initial_deposit {
			ledger.transfer_value(deployer, vault.address(), deposit)?;
		}
		ledger.commit();

		tracing::info!(
			chain_id = vault_config.chain_id,
			%deployer,
			manager = %manager_address,
			vault = %vault.address(),
			signer = %initial_signer,
			balance = %vault.balance(&ledger),
			"Deployment complete"
		);

		Ok(VaultService::new(ledger, vault, manager))
	}
}
