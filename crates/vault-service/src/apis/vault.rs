//! Vault status, authorization lookups and deposits.

use crate::apis::withdraw::to_api_error;
use vault_core::{LedgerError, VaultError, VaultService};
use vault_types::{
	APIError, AuthorizationStatusResponse, DepositRequest, DepositResponse, VaultStatusResponse,
	U256,
};

pub async fn get_status(service: &VaultService) -> VaultStatusResponse {
	service.status().await
}

/// Looks up whether the authorization with the given decimal nonce is spent.
pub async fn get_authorization(
	nonce: &str,
	service: &VaultService,
) -> Result<AuthorizationStatusResponse, APIError> {
	let nonce = U256::from_str_radix(nonce.trim(), 10).map_err(|e| APIError::BadRequest {
		error_type: "INVALID_NONCE".to_string(),
		message: format!("Nonce must be a decimal integer: {}", e),
	})?;

	Ok(AuthorizationStatusResponse {
		nonce,
		consumed: service.is_consumed(&nonce).await,
	})
}

/// Processes a deposit signed by its source account.
pub async fn process_deposit(
	request: DepositRequest,
	service: &VaultService,
) -> Result<DepositResponse, APIError> {
	tracing::info!(from = %request.from, amount = %request.amount, nonce = %request.nonce, "Deposit submitted");

	let vault_balance = service
		.deposit_signed(&request)
		.await
		.map_err(|e| match e {
			VaultError::Ledger(LedgerError::InsufficientBalance { .. }) => {
				APIError::UnprocessableEntity {
					error_type: "INSUFFICIENT_BALANCE".to_string(),
					message: e.to_string(),
				}
			},
			VaultError::Ledger(LedgerError::BalanceOverflow(_)) => APIError::UnprocessableEntity {
				error_type: "BALANCE_OVERFLOW".to_string(),
				message: e.to_string(),
			},
			other => to_api_error(other),
		})?;

	Ok(DepositResponse { vault_balance })
}
