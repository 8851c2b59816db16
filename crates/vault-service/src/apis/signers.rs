//! Trusted signer lookups.

use vault_core::VaultService;
use vault_types::{APIError, Address, SignerStatusResponse};

pub fn get_signer(address: &str, service: &VaultService) -> Result<SignerStatusResponse, APIError> {
	let address: Address = address.parse().map_err(|_| APIError::BadRequest {
		error_type: "INVALID_ADDRESS".to_string(),
		message: format!("Invalid address: {}", address),
	})?;

	Ok(SignerStatusResponse {
		address,
		trusted: service.is_trusted_signer(&address),
	})
}
