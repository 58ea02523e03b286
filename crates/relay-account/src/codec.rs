//! Signature codec for claim meta-transactions.
//!
//! The claim digest is `keccak256(abi.encode(bytes32 itemId, address finder,
//! string descriptionLink))`. The item's claimer key signs that digest as an
//! EIP-191 personal message (`"\x19Ethereum Signed Message:\n32" ‖ digest`),
//! which is exactly what the contract re-derives before calling `ecrecover`.

use alloy_primitives::{keccak256, Address, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolValue;
use relay_types::{parse_address, parse_item_id, ClaimSignature, EncodingError, ItemId};
use thiserror::Error;

/// Errors raised while producing a claim signature.
#[derive(Debug, Error)]
pub enum SigningError {
	/// The key material could not be parsed into a secp256k1 key.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The signer refused to sign.
	#[error("Signing failed: {0}")]
	Failed(String),
}

/// ABI-encodes the claim fields and returns their keccak-256 digest.
pub fn encode(item_id: &ItemId, finder: &Address, description_link: &str) -> B256 {
	let encoded = (*item_id, *finder, description_link.to_string()).abi_encode_params();
	keccak256(encoded)
}

/// Same as [`encode`] for hex string input.
pub fn encode_hex(
	item_id: &str,
	finder: &str,
	description_link: &str,
) -> Result<B256, EncodingError> {
	let item_id = parse_item_id(item_id)?;
	let finder = parse_address("finder", finder)?;
	Ok(encode(&item_id, &finder, description_link))
}

/// Parses a hex private key, with or without `0x`.
pub fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner, SigningError> {
	private_key
		.trim()
		.parse::<PrivateKeySigner>()
		.map_err(|e| SigningError::InvalidKey(e.to_string()))
}

/// Signs `digest` as a personal message with `private_key`.
pub fn sign(private_key: &str, digest: &B256) -> Result<ClaimSignature, SigningError> {
	sign_with(&parse_private_key(private_key)?, digest)
}

/// Signs `digest` as a personal message with an already parsed signer.
pub fn sign_with(signer: &PrivateKeySigner, digest: &B256) -> Result<ClaimSignature, SigningError> {
	signer
		.sign_message_sync(digest.as_slice())
		.map(ClaimSignature::from)
		.map_err(|e| SigningError::Failed(e.to_string()))
}

/// Recovers the account that produced `signature` over `digest`.
pub fn recover(digest: &B256, signature: &ClaimSignature) -> Result<Address, EncodingError> {
	signature
		.to_primitive()
		.recover_address_from_msg(digest.as_slice())
		.map_err(|e| EncodingError::InvalidSignature(e.to_string()))
}

/// Encodes the claim fields and signs the digest with `private_key`.
pub fn sign_claim(
	private_key: &str,
	item_id: &ItemId,
	finder: &Address,
	description_link: &str,
) -> Result<ClaimSignature, SigningError> {
	sign(private_key, &encode(item_id, finder, description_link))
}
