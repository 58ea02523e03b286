//! Ledger-facing types.
//!
//! These types describe what the relay learns from the ledger collaborator:
//! where the contract lives, which transaction carried a claim, and the claim
//! events the contract emitted.

use crate::ItemId;
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHash(pub B256);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A deployed contract resolved by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractReference {
	/// Address the contract is deployed at.
	pub address: Address,
	/// Chain the contract lives on.
	pub chain_id: u64,
}

/// One `ItemClaimed` event emitted by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEvent {
	/// Contract-assigned claim identifier.
	pub claim_id: u64,
	/// Item the claim was made for.
	pub item_id: ItemId,
	/// Finder recorded on the claim.
	pub finder: Address,
	/// Transaction that emitted the event, when known.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transaction_hash: Option<TransactionHash>,
	/// Block the event was included in, when known.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub block_number: Option<u64>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transaction_hash_display_is_prefixed_hex() {
		let hash = TransactionHash(B256::repeat_byte(0x01));
		let rendered = hash.to_string();
		assert!(rendered.starts_with("0x"));
		assert_eq!(rendered.len(), 66);
	}

	#[test]
	fn test_claim_event_serializes_camel_case() {
		let event = ClaimEvent {
			claim_id: 3,
			item_id: B256::ZERO,
			finder: Address::ZERO,
			transaction_hash: None,
			block_number: Some(10),
		};
		let json = serde_json::to_value(&event).unwrap();
		assert_eq!(json["claimId"], 3);
		assert_eq!(json["blockNumber"], 10);
		assert!(json.get("transactionHash").is_none());
	}
}
