//! Recoverable signature parsing and signer recovery.

use super::VaultError;
use alloy_primitives::{uint, PrimitiveSignature};
use vault_types::{Address, B256, SIGNATURE_LENGTH, U256};

/// Half the secp256k1 group order. Larger `s` values are the malleable twin
/// of a valid signature and are refused.
const SECP256K1N_HALF: U256 =
	uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Recovers the address that produced `signature` over `digest`.
///
/// `signature` must be `r || s || v` with `v` in {27, 28} and a low `s`.
/// A well-formed signature that does not recover to a valid key yields
/// [`VaultError::InvalidSignature`].
pub fn recover_signer(signature: &[u8], digest: &B256) -> Result<Address, VaultError> {
	if signature.len() != SIGNATURE_LENGTH {
		return Err(VaultError::MalformedSignature {
			reason: format!(
				"expected {} bytes, got {}",
				SIGNATURE_LENGTH,
				signature.len()
			),
		});
	}

	let r = U256::from_be_slice(&signature[..32]);
	let s = U256::from_be_slice(&signature[32..64]);
	let y_parity = match signature[64] {
		27 => false,
		28 => true,
		v => {
			return Err(VaultError::MalformedSignature {
				reason: format!("invalid recovery id {}", v),
			})
		},
	};

	if s > SECP256K1N_HALF {
		return Err(VaultError::MalformedSignature {
			reason: "s value in upper half of curve order".to_string(),
		});
	}

	PrimitiveSignature::new(r, s, y_parity)
		.recover_address_from_prehash(digest)
		.map_err(|e| {
			tracing::debug!("Signature recovery failed: {}", e);
			VaultError::InvalidSignature
		})
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{eip191_hash_message, keccak256};
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;

	fn signed() -> (PrivateKeySigner, B256, Vec<u8>) {
		let signer: PrivateKeySigner =
			"0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
				.parse()
				.unwrap();
		let hash = keccak256(b"authorization");
		let signature = signer.sign_message_sync(hash.as_slice()).unwrap();
		(signer, eip191_hash_message(hash), signature.as_bytes().to_vec())
	}

	#[test]
	fn test_recovers_signer() {
		let (signer, digest, signature) = signed();
		assert_eq!(recover_signer(&signature, &digest).unwrap(), signer.address());
	}

	#[test]
	fn test_rejects_wrong_length() {
		let (_, digest, signature) = signed();
		let err = recover_signer(&signature[..64], &digest).unwrap_err();
		assert!(matches!(err, VaultError::MalformedSignature { .. }));
	}

	#[test]
	fn test_rejects_bad_recovery_id() {
		let (_, digest, mut signature) = signed();
		signature[64] = 1;
		assert!(matches!(
			recover_signer(&signature, &digest),
			Err(VaultError::MalformedSignature { .. })
		));
	}

	#[test]
	fn test_rejects_high_s() {
		let (_, digest, mut signature) = signed();
		signature[32..64].copy_from_slice(&U256::MAX.to_be_bytes::<32>());
		assert!(matches!(
			recover_signer(&signature, &digest),
			Err(VaultError::MalformedSignature { .. })
		));
	}

	#[test]
	fn test_other_digest_recovers_other_address() {
		let (signer, _, signature) = signed();
		let digest = eip191_hash_message(keccak256(b"something else"));
		match recover_signer(&signature, &digest) {
			Ok(address) => assert_ne!(address, signer.address()),
			Err(err) => assert!(matches!(err, VaultError::InvalidSignature)),
		}
	}
}
