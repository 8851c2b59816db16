//! Local signer backed by an in-memory secp256k1 private key.

use crate::{SignerError, SignerFactory, SignerImplementationRegistry, SignerInterface};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use vault_types::{
	without_0x_prefix, Address, Bytes, ConfigSchema, Field, FieldType, ImplementationRegistry,
	Schema, SecretString, ValidationError,
};

/// Signer holding its private key in process memory.
pub struct LocalSigner {
	signer: PrivateKeySigner,
}

impl LocalSigner {
	pub fn new(private_key: &SecretString) -> Result<Self, SignerError> {
		let signer = private_key.with_exposed(|key| {
			key.parse::<PrivateKeySigner>()
				.map_err(|_| SignerError::InvalidKey("Invalid private key format".to_string()))
		})?;
		Ok(Self { signer })
	}
}

/// Configuration schema for the local signer.
pub struct LocalSignerSchema;

impl ConfigSchema for LocalSignerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|value| {
				let key = value.as_str().unwrap_or_default();
				let hex_part = without_0x_prefix(key);
				if hex_part.len() != 64 {
					return Err("Private key must be 64 hex characters".to_string());
				}
				if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
					return Err("Private key must contain only hex characters".to_string());
				}
				Ok(())
			})],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalSignerSchema)
	}

	async fn address(&self) -> Result<Address, SignerError> {
		Ok(self.signer.address())
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError> {
		let signature = self
			.signer
			.sign_message(message)
			.await
			.map_err(|e| SignerError::SigningFailed(e.to_string()))?;
		Ok(Bytes::copy_from_slice(&signature.as_bytes()))
	}
}

/// Factory function to create a local signer from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 key, with or without 0x prefix
pub fn create_signer(config: &toml::Value) -> Result<Box<dyn SignerInterface>, SignerError> {
	LocalSignerSchema
		.validate(config)
		.map_err(|e| SignerError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| SignerError::InvalidKey("private_key is required".to_string()))?;

	let signer = LocalSigner::new(&private_key)?;
	tracing::debug!(address = %signer.signer.address(), "Local signer loaded");
	Ok(Box::new(signer))
}

/// Registry for the local signer implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = SignerFactory;

	fn factory() -> Self::Factory {
		create_signer
	}
}

impl SignerImplementationRegistry for Registry {}
