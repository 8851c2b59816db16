//! API types for the vault HTTP API.
//!
//! This module defines the request and response bodies served by the vault
//! service, plus the error type that maps vault failures onto HTTP statuses.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body for POST /api/deposits.
///
/// `signature` is the EIP-191 signature of `from` over the hash of the
/// matching [`crate::DepositAuthorization`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
	/// Account the value is taken from.
	pub from: Address,
	/// Amount in wei.
	#[serde(with = "u256_serde")]
	pub amount: U256,
	/// Single-use identifier, scoped to `from`.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	pub signature: Bytes,
}

/// Response for a processed deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositResponse {
	#[serde(rename = "vaultBalance", with = "u256_serde")]
	pub vault_balance: U256,
}

/// Receipt returned for a successful withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
	pub vault: Address,
	pub recipient: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	/// Address recovered from the signature.
	pub signer: Address,
	/// Hash of the canonical authorization encoding.
	#[serde(rename = "authorizationHash")]
	pub authorization_hash: B256,
	/// Vault balance after the withdrawal.
	#[serde(rename = "remainingBalance", with = "u256_serde")]
	pub remaining_balance: U256,
}

/// Response for GET /api/vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultStatusResponse {
	pub vault: Address,
	#[serde(rename = "authorizationManager")]
	pub authorization_manager: Address,
	#[serde(rename = "chainId")]
	pub chain_id: u64,
	#[serde(with = "u256_serde")]
	pub balance: U256,
	#[serde(rename = "consumedAuthorizations")]
	pub consumed_authorizations: usize,
}

/// Response for GET /api/signers/{address}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerStatusResponse {
	pub address: Address,
	pub trusted: bool,
}

/// Response for GET /api/authorizations/{nonce}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationStatusResponse {
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	pub consumed: bool,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Stable machine-readable error kind.
	pub error: String,
	/// Human-readable reason.
	pub message: String,
}

/// API error carrying an HTTP status class.
#[derive(Debug)]
pub enum APIError {
	/// Malformed input (400).
	BadRequest { error_type: String, message: String },
	/// Signature not accepted (401).
	Unauthorized { error_type: String, message: String },
	/// State conflict such as a consumed nonce (409).
	Conflict { error_type: String, message: String },
	/// Well-formed but not executable, e.g. insufficient funds (422).
	UnprocessableEntity { error_type: String, message: String },
	/// Internal server error (500).
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			APIError::BadRequest { error_type, message }
			| APIError::Unauthorized { error_type, message }
			| APIError::Conflict { error_type, message }
			| APIError::UnprocessableEntity { error_type, message }
			| APIError::InternalServerError { error_type, message } => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({}): {}", response.error, self.status_code(), response.message)
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

/// Serde module for U256 as a decimal string.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(s.trim(), 10).map_err(D::Error::custom)
	}
}
