//! Withdrawal authorization types.
//!
//! An authorization is the tuple `(vault, recipient, amount, nonce, chainId)`.
//! Its canonical preimage is the Solidity `abi.encode` of the tuple, hashed with
//! keccak256. Trusted signers sign that 32-byte hash as an EIP-191 personal
//! message, so the digest actually covered by the signature is
//! `keccak256("\x19Ethereum Signed Message:\n32" || hash)`.
//!
//! Deposits out of an externally owned account are authorized the same way by
//! the account itself, over a tagged tuple that can never collide with a
//! withdrawal preimage.

use crate::api::u256_serde;
use alloy_primitives::{eip191_hash_message, keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

/// Number of ABI words in the canonical encoding.
pub const AUTHORIZATION_WORDS: usize = 5;

/// Length in bytes of a recoverable `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// The message a trusted signer authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationMessage {
	/// Vault the authorization is bound to.
	pub vault: Address,
	/// Destination of the released value.
	pub recipient: Address,
	/// Value to release, in wei.
	#[serde(with = "u256_serde")]
	pub amount: U256,
	/// Caller-chosen single-use identifier.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	/// Chain the authorization is valid on.
	#[serde(with = "u256_serde")]
	pub chain_id: U256,
}

impl AuthorizationMessage {
	pub fn new(vault: Address, recipient: Address, amount: U256, nonce: U256, chain_id: u64) -> Self {
		Self {
			vault,
			recipient,
			amount,
			nonce,
			chain_id: U256::from(chain_id),
		}
	}

	/// Returns the canonical `abi.encode(address,address,uint256,uint256,uint256)` bytes.
	pub fn encode(&self) -> Vec<u8> {
		(self.vault, self.recipient, self.amount, self.nonce, self.chain_id).abi_encode_params()
	}

	/// keccak256 of the canonical encoding. This is the value handed to the signer.
	pub fn hash(&self) -> B256 {
		keccak256(self.encode())
	}

	/// EIP-191 digest of [`Self::hash`]; the prehash a signature is recovered against.
	pub fn signing_digest(&self) -> B256 {
		eip191_hash_message(self.hash())
	}
}

/// A withdrawal submission: the plaintext parameters plus the signature.
///
/// The vault address and chain id are not part of the request; the vault
/// fills them in from its own state when it rebuilds the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
	pub recipient: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	pub signature: Bytes,
}

impl WithdrawRequest {
	pub fn new(recipient: Address, amount: U256, nonce: U256, signature: impl Into<Bytes>) -> Self {
		Self {
			recipient,
			amount,
			nonce,
			signature: signature.into(),
		}
	}
}

/// Type string whose hash leads every deposit preimage.
pub const DEPOSIT_TYPE: &str =
	"Deposit(address vault,address from,uint256 amount,uint256 nonce,uint256 chainId)";

/// A deposit the owner of `from` agrees to move into `vault`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositAuthorization {
	pub vault: Address,
	pub from: Address,
	pub amount: U256,
	pub nonce: U256,
	pub chain_id: U256,
}

impl DepositAuthorization {
	pub fn new(vault: Address, from: Address, amount: U256, nonce: U256, chain_id: u64) -> Self {
		Self {
			vault,
			from,
			amount,
			nonce,
			chain_id: U256::from(chain_id),
		}
	}

	/// `abi.encode(keccak256(DEPOSIT_TYPE), vault, from, amount, nonce, chainId)`.
	pub fn encode(&self) -> Vec<u8> {
		(
			keccak256(DEPOSIT_TYPE),
			self.vault,
			self.from,
			self.amount,
			self.nonce,
			self.chain_id,
		)
			.abi_encode_params()
	}

	pub fn hash(&self) -> B256 {
		keccak256(self.encode())
	}

	pub fn signing_digest(&self) -> B256 {
		eip191_hash_message(self.hash())
	}
}
