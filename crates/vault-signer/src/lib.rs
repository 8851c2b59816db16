//! Off-chain signing of withdrawal authorizations.
//!
//! A trusted signer approves a withdrawal by signing the keccak256 hash of the
//! canonical [`AuthorizationMessage`] with an EIP-191 personal message
//! signature. This crate defines the interface signer implementations provide
//! and the [`AuthorizationSigner`] service that produces ready-to-submit
//! [`WithdrawRequest`]s.

use async_trait::async_trait;
use thiserror::Error;
use vault_types::{
	Address, AuthorizationMessage, Bytes, ConfigSchema, DepositAuthorization, DepositRequest,
	ImplementationRegistry, WithdrawRequest, U256,
};

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum SignerError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the signer implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for signer implementations.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Returns the configuration schema for this signer implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address recovered from this signer's signatures.
	async fn address(&self) -> Result<Address, SignerError>;

	/// Signs `message` as an EIP-191 personal message and returns the 65-byte
	/// `r || s || v` signature with `v` in {27, 28}.
	async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError>;
}

/// Type alias for signer factory functions.
pub type SignerFactory = fn(&toml::Value) -> Result<Box<dyn SignerInterface>, SignerError>;

/// Registry trait for signer implementations.
pub trait SignerImplementationRegistry: ImplementationRegistry<Factory = SignerFactory> {}

/// Get all registered signer implementations.
///
/// Returns a vector of (name, factory) tuples for all available signer implementations.
pub fn get_all_implementations() -> Vec<(&'static str, SignerFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Creates the signer implementation registered under `name`.
pub fn create_signer(
	name: &str,
	config: &toml::Value,
) -> Result<Box<dyn SignerInterface>, SignerError> {
	let (_, factory) = get_all_implementations()
		.into_iter()
		.find(|(registered, _)| *registered == name)
		.ok_or_else(|| {
			SignerError::Implementation(format!("Unknown signer implementation '{}'", name))
		})?;
	factory(config)
}

/// Service that signs withdrawal authorizations.
pub struct AuthorizationSigner {
	implementation: Box<dyn SignerInterface>,
}

impl AuthorizationSigner {
	pub fn new(implementation: Box<dyn SignerInterface>) -> Self {
		Self { implementation }
	}

	pub async fn address(&self) -> Result<Address, SignerError> {
		self.implementation.address().await
	}

	/// Signs the hash of `message`.
	pub async fn sign_authorization(
		&self,
		message: &AuthorizationMessage,
	) -> Result<Bytes, SignerError> {
		let hash = message.hash();
		tracing::debug!(
			vault = %message.vault,
			recipient = %message.recipient,
			amount = %message.amount,
			nonce = %message.nonce,
			%hash,
			"Signing authorization"
		);
		self.implementation.sign_message(hash.as_slice()).await
	}

	/// Builds and signs the authorization for a withdrawal from `vault` on
	/// `chain_id`, returning the request to submit.
	pub async fn sign_withdrawal(
		&self,
		vault: Address,
		recipient: Address,
		amount: U256,
		nonce: U256,
		chain_id: u64,
	) -> Result<WithdrawRequest, SignerError> {
		let message = AuthorizationMessage::new(vault, recipient, amount, nonce, chain_id);
		let signature = self.sign_authorization(&message).await?;
		Ok(WithdrawRequest::new(recipient, amount, nonce, signature))
	}

	/// Signs a deposit of `amount` from this signer's own account into `vault`.
	pub async fn sign_deposit(
		&self,
		vault: Address,
		amount: U256,
		nonce: U256,
		chain_id: u64,
	) -> Result<DepositRequest, SignerError> {
		let from = self.address().await?;
		let authorization = DepositAuthorization::new(vault, from, amount, nonce, chain_id);
		let hash = authorization.hash();
		tracing::debug!(%vault, %from, %amount, %nonce, %hash, "Signing deposit");
		let signature = self.implementation.sign_message(hash.as_slice()).await?;
		Ok(DepositRequest {
			from,
			amount,
			nonce,
			signature,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DEV_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	fn local_config() -> toml::Value {
		toml::from_str(&format!("private_key = \"{}\"", DEV_KEY)).unwrap()
	}

	#[test]
	fn test_registry_lists_local() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["local"]);
	}

	#[test]
	fn test_unknown_implementation() {
		let err = create_signer("hsm", &local_config()).err().unwrap();
		assert!(err.to_string().contains("hsm"));
	}

	#[tokio::test]
	async fn test_signed_withdrawal_recovers_to_signer() {
		let signer = AuthorizationSigner::new(create_signer("local", &local_config()).unwrap());
		let vault = Address::repeat_byte(0xaa);
		let recipient = Address::repeat_byte(0xbb);

		let request = signer
			.sign_withdrawal(vault, recipient, U256::from(100u64), U256::from(1u64), 31337)
			.await
			.unwrap();
		assert_eq!(request.signature.len(), 65);
		assert!(matches!(request.signature[64], 27 | 28));

		let message =
			AuthorizationMessage::new(vault, recipient, U256::from(100u64), U256::from(1u64), 31337);
		let signature =
			alloy_primitives::PrimitiveSignature::try_from(request.signature.as_ref()).unwrap();
		let recovered = signature
			.recover_address_from_prehash(&message.signing_digest())
			.unwrap();
		assert_eq!(recovered, signer.address().await.unwrap());
	}

	#[tokio::test]
	async fn test_signed_deposit_recovers_to_depositor() {
		let signer = AuthorizationSigner::new(create_signer("local", &local_config()).unwrap());
		let vault = Address::repeat_byte(0xaa);

		let request = signer
			.sign_deposit(vault, U256::from(5u64), U256::ZERO, 31337)
			.await
			.unwrap();
		assert_eq!(request.from, signer.address().await.unwrap());

		let authorization =
			DepositAuthorization::new(vault, request.from, U256::from(5u64), U256::ZERO, 31337);
		let signature =
			alloy_primitives::PrimitiveSignature::try_from(request.signature.as_ref()).unwrap();
		let recovered = signature
			.recover_address_from_prehash(&authorization.signing_digest())
			.unwrap();
		assert_eq!(recovered, request.from);
	}
}
