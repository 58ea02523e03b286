//! Secure string type for relay key material.
//!
//! The relay account is derived from a mnemonic or a raw private key. Both are
//! held in a `SecretString`, which zeroes its buffer on drop and never shows
//! its contents in logs, debug output or serialized configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// A zeroizing, redacting string wrapper.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret to a closure, limiting the scope it is visible in.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MNEMONIC: &str = "test test test test test test test test test test test junk";

	#[test]
	fn test_mnemonic_is_never_rendered() {
		let secret = SecretString::from(MNEMONIC);
		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(secret.to_string(), REDACTED);
		assert_eq!(serde_json::to_string(&secret).unwrap(), "\"***REDACTED***\"");
	}

	#[test]
	fn test_with_exposed_yields_original_value() {
		let secret = SecretString::from(MNEMONIC);
		let words = secret.with_exposed(|s| s.split_whitespace().count());
		assert_eq!(words, 12);
	}

	#[test]
	fn test_deserialize_and_emptiness() {
		let secret: SecretString = serde_json::from_str("\"0xabc\"").unwrap();
		assert!(!secret.is_empty());
		assert_eq!(secret, SecretString::from("0xabc"));
		assert!(SecretString::from("   ").is_empty());
	}
}
