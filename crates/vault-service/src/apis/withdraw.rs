//! Withdrawal submission.
//!
//! A submission is the plaintext `(recipient, amount, nonce)` plus the
//! trusted signer's signature. The vault rebuilds the authorization from its
//! own address and chain id, so a signature made for another vault or chain
//! fails as an invalid signature.

use vault_core::{VaultError, VaultService};
use vault_types::{APIError, WithdrawReceipt, WithdrawRequest};

/// Processes a withdrawal and maps vault failures onto API errors.
pub async fn process_withdrawal(
	request: WithdrawRequest,
	service: &VaultService,
) -> Result<WithdrawReceipt, APIError> {
	tracing::info!(
		recipient = %request.recipient,
		amount = %request.amount,
		nonce = %request.nonce,
		"Withdrawal submitted"
	);

	service.withdraw(&request).await.map_err(|e| {
		tracing::warn!(nonce = %request.nonce, kind = e.kind(), "Withdrawal rejected: {}", e);
		to_api_error(e)
	})
}

/// Maps a vault error to its HTTP status. The body carries the stable kind
/// code and the error's display text.
pub fn to_api_error(error: VaultError) -> APIError {
	let error_type = error.kind().to_string();
	let message = error.to_string();
	match error {
		VaultError::InvalidRecipient
		| VaultError::InvalidAmount
		| VaultError::MalformedSignature { .. } => APIError::BadRequest {
			error_type,
			message,
		},
		VaultError::InvalidSignature => APIError::Unauthorized {
			error_type,
			message,
		},
		VaultError::AlreadyConsumed => APIError::Conflict {
			error_type,
			message,
		},
		VaultError::InsufficientFunds { .. } | VaultError::TransferFailed(_) => {
			APIError::UnprocessableEntity {
				error_type,
				message,
			}
		},
		VaultError::Configuration(_) | VaultError::Ledger(_) => APIError::InternalServerError {
			error_type,
			message,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use vault_types::U256;

	#[test]
	fn test_status_mapping() {
		let cases = [
			(VaultError::InvalidRecipient, 400),
			(VaultError::InvalidAmount, 400),
			(
				VaultError::MalformedSignature {
					reason: "bad length".into(),
				},
				400,
			),
			(VaultError::InvalidSignature, 401),
			(VaultError::AlreadyConsumed, 409),
			(
				VaultError::InsufficientFunds {
					available: U256::ZERO,
					requested: U256::from(1u64),
				},
				422,
			),
			(VaultError::TransferFailed("rejected".into()), 422),
			(VaultError::Configuration("broken".into()), 500),
		];

		for (error, status) in cases {
			assert_eq!(to_api_error(error).status_code(), status);
		}
	}

	#[test]
	fn test_body_uses_kind_and_reason() {
		let body = to_api_error(VaultError::AlreadyConsumed).to_error_response();
		assert_eq!(body.error, "AUTHORIZATION_CONSUMED");
		assert_eq!(body.message, "Authorization already consumed");
	}
}
