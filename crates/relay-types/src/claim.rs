//! Claim request types.
//!
//! A claim is a finder's assertion that they located a registered item. It is
//! bundled with a detached recoverable signature produced by the item's
//! designated claimer key over the canonical encoding of the claim fields.

use alloy_primitives::{Address, PrimitiveSignature, B256, U256};
use serde::Serialize;
use thiserror::Error;

/// Identifier of a registered item (`bytes32` on the contract).
pub type ItemId = B256;

/// Errors raised while turning raw input into claim fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
	/// A hex field could not be decoded.
	#[error("Invalid hex in {field}: {message}")]
	InvalidHex { field: String, message: String },
	/// A fixed-width field had the wrong number of bytes.
	#[error("Invalid length for {field}: expected {expected} bytes, got {actual}")]
	InvalidLength {
		field: String,
		expected: usize,
		actual: usize,
	},
	/// The signature recovery component is out of range.
	#[error("Invalid recovery id: {0} (expected 0, 1, 27 or 28)")]
	InvalidRecoveryId(u64),
	/// The signature does not describe a valid curve point.
	#[error("Invalid signature: {0}")]
	InvalidSignature(String),
}

/// Detached recoverable signature `{v, r, s}`.
///
/// `v` is always stored in its 27/28 form, which is what the contract's
/// `ecrecover` expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClaimSignature {
	v: u8,
	r: B256,
	s: B256,
}

impl ClaimSignature {
	/// Builds a signature, normalizing a 0/1 recovery id to 27/28.
	pub fn new(v: u64, r: B256, s: B256) -> Result<Self, EncodingError> {
		let v = match v {
			0 | 1 => v as u8 + 27,
			27 | 28 => v as u8,
			other => return Err(EncodingError::InvalidRecoveryId(other)),
		};
		Ok(Self { v, r, s })
	}

	pub fn v(&self) -> u8 {
		self.v
	}

	pub fn r(&self) -> B256 {
		self.r
	}

	pub fn s(&self) -> B256 {
		self.s
	}

	/// Parity bit of the recovery id.
	pub fn y_parity(&self) -> bool {
		self.v == 28
	}

	/// Converts into alloy's signature type for recovery.
	pub fn to_primitive(&self) -> PrimitiveSignature {
		PrimitiveSignature::new(
			U256::from_be_bytes(self.r.0),
			U256::from_be_bytes(self.s.0),
			self.y_parity(),
		)
	}
}

impl From<PrimitiveSignature> for ClaimSignature {
	fn from(signature: PrimitiveSignature) -> Self {
		Self {
			v: 27 + signature.v() as u8,
			r: B256::from(signature.r().to_be_bytes::<32>()),
			s: B256::from(signature.s().to_be_bytes::<32>()),
		}
	}
}

/// A claim submitted to the relay.
///
/// Immutable once constructed: a request is created per relay invocation and
/// consumed to produce exactly one [`crate::RelayOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimRequest {
	item_id: ItemId,
	finder: Address,
	description_link: String,
	signature: ClaimSignature,
}

impl ClaimRequest {
	pub fn new(
		item_id: ItemId,
		finder: Address,
		description_link: impl Into<String>,
		signature: ClaimSignature,
	) -> Self {
		Self {
			item_id,
			finder,
			description_link: description_link.into(),
			signature,
		}
	}

	pub fn item_id(&self) -> &ItemId {
		&self.item_id
	}

	pub fn finder(&self) -> &Address {
		&self.finder
	}

	pub fn description_link(&self) -> &str {
		&self.description_link
	}

	pub fn signature(&self) -> &ClaimSignature {
		&self.signature
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_recovery_id_normalization() {
		let r = B256::repeat_byte(0x11);
		let s = B256::repeat_byte(0x22);

		assert_eq!(ClaimSignature::new(0, r, s).unwrap().v(), 27);
		assert_eq!(ClaimSignature::new(1, r, s).unwrap().v(), 28);
		assert_eq!(ClaimSignature::new(27, r, s).unwrap().v(), 27);
		assert_eq!(ClaimSignature::new(28, r, s).unwrap().v(), 28);
		assert_eq!(
			ClaimSignature::new(29, r, s),
			Err(EncodingError::InvalidRecoveryId(29))
		);
	}

	#[test]
	fn test_primitive_conversion_preserves_components() {
		let r = B256::repeat_byte(0x0a);
		let s = B256::repeat_byte(0x0b);
		let signature = ClaimSignature::new(28, r, s).unwrap();

		let back = ClaimSignature::from(signature.to_primitive());
		assert_eq!(back, signature);
		assert!(back.y_parity());
	}
}
