//! Conversion utilities for wire-level hex values.

use super::formatting::without_0x_prefix;
use crate::{EncodingError, ItemId};
use alloy_primitives::{Address, B256};

/// Decodes a hex string, tolerating a missing `0x` prefix and odd length.
fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, EncodingError> {
	let digits = without_0x_prefix(value.trim());
	let padded;
	let digits = if digits.len() % 2 == 1 {
		padded = format!("0{}", digits);
		padded.as_str()
	} else {
		digits
	};

	hex::decode(digits).map_err(|e| EncodingError::InvalidHex {
		field: field.to_string(),
		message: e.to_string(),
	})
}

/// Parses a 20-byte account identifier.
pub fn parse_address(field: &str, value: &str) -> Result<Address, EncodingError> {
	let bytes = decode_hex(field, value)?;
	if bytes.len() != 20 {
		return Err(EncodingError::InvalidLength {
			field: field.to_string(),
			expected: 20,
			actual: bytes.len(),
		});
	}
	Ok(Address::from_slice(&bytes))
}

/// Parses an exactly 32-byte value such as a signature component.
pub fn parse_b256(field: &str, value: &str) -> Result<B256, EncodingError> {
	let bytes = decode_hex(field, value)?;
	if bytes.len() != 32 {
		return Err(EncodingError::InvalidLength {
			field: field.to_string(),
			expected: 32,
			actual: bytes.len(),
		});
	}
	Ok(B256::from_slice(&bytes))
}

/// Parses an item identifier.
///
/// Shorter values are right-padded with zero digits before decoding, the way
/// web3 formats a `bytes32` parameter: `0x1` becomes `0x1000…00` while `0x01`
/// becomes `0x0100…00`.
pub fn parse_item_id(value: &str) -> Result<ItemId, EncodingError> {
	let digits = without_0x_prefix(value.trim());
	if digits.is_empty() || digits.len() > 64 {
		return Err(EncodingError::InvalidLength {
			field: "goodID".to_string(),
			expected: 32,
			actual: digits.len().div_ceil(2),
		});
	}

	let padded = format!("{:0<64}", digits);
	let bytes = hex::decode(&padded).map_err(|e| EncodingError::InvalidHex {
		field: "goodID".to_string(),
		message: e.to_string(),
	})?;
	Ok(B256::from_slice(&bytes))
}
