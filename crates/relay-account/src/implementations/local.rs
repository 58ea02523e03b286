//! Local key account implementation.
//!
//! Loads the relay key either from a raw hex `private_key` or from a BIP-39
//! `mnemonic`, deriving `m/44'/60'/0'/0/{index}` with `index` defaulting to 0.

use crate::{codec, AccountError, AccountInterface};
use alloy_primitives::B256;
use alloy_signer_local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use async_trait::async_trait;
use relay_types::{
	Address, ClaimSignature, ConfigSchema, Field, FieldType, Schema, SecretString, ValidationError,
};

/// Account backed by a key held in process memory.
#[derive(Debug)]
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a wallet from a hex private key.
	pub fn from_private_key(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key.with_exposed(codec::parse_private_key)?;
		Ok(Self { signer })
	}

	/// Derives the wallet at `index` from a BIP-39 mnemonic.
	pub fn from_mnemonic(mnemonic: &SecretString, index: u32) -> Result<Self, AccountError> {
		if mnemonic.is_empty() {
			return Err(AccountError::InvalidKey("Mnemonic is empty".to_string()));
		}
		let signer = mnemonic.with_exposed(|phrase| {
			MnemonicBuilder::<English>::default()
				.phrase(phrase.trim())
				.index(index)
				.and_then(|builder| builder.build())
				.map_err(|e| AccountError::InvalidKey(format!("Invalid mnemonic: {}", e)))
		})?;
		Ok(Self { signer })
	}
}

/// Configuration schema for LocalWallet.
pub struct LocalWalletSchema;

impl LocalWalletSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let digits = key.strip_prefix("0x").unwrap_or(key);
					if digits.len() != 64 {
						return Err("Private key must be 64 hex characters (32 bytes)".to_string());
					}
					if hex::decode(digits).is_err() {
						return Err("Private key must be valid hexadecimal".to_string());
					}
					Ok(())
				}),
				Field::new("mnemonic", FieldType::String).with_validator(|value| {
					let words = value.as_str().unwrap_or_default().split_whitespace().count();
					if ![12, 15, 18, 21, 24].contains(&words) {
						return Err(format!("Mnemonic must have 12 to 24 words, got {}", words));
					}
					Ok(())
				}),
				Field::new(
					"index",
					FieldType::Integer {
						min: Some(0),
						max: Some(u32::MAX as i64),
					},
				),
			],
		);
		schema.validate(config)?;

		let has_key = config.get("private_key").is_some();
		let has_mnemonic = config.get("mnemonic").is_some();
		match (has_key, has_mnemonic) {
			(true, true) => Err(ValidationError::InvalidValue {
				field: "private_key".to_string(),
				message: "Specify either private_key or mnemonic, not both".to_string(),
			}),
			(false, false) => Err(ValidationError::MissingField(
				"private_key or mnemonic".to_string(),
			)),
			_ => Ok(()),
		}
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_digest(&self, digest: &B256) -> Result<ClaimSignature, AccountError> {
		Ok(codec::sign_with(&self.signer, digest)?)
	}

	fn signer(&self) -> PrivateKeySigner {
		self.signer.clone()
	}
}

/// Factory function to create an account provider from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex private key with or without 0x prefix
/// - `mnemonic`: BIP-39 phrase, alternative to `private_key`
/// - `index`: derivation index for `mnemonic` (default 0)
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema::validate_config(config)
		.map_err(|e| AccountError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let wallet = if let Some(key) = config.get("private_key").and_then(|v| v.as_str()) {
		LocalWallet::from_private_key(&SecretString::from(key))?
	} else {
		let mnemonic = config
			.get("mnemonic")
			.and_then(|v| v.as_str())
			.ok_or_else(|| AccountError::InvalidKey("mnemonic is required".into()))?;
		let index = config
			.get("index")
			.and_then(|v| v.as_integer())
			.unwrap_or(0) as u32;
		LocalWallet::from_mnemonic(&SecretString::from(mnemonic), index)?
	};

	tracing::debug!(address = %wallet.signer.address(), "Loaded relay account");
	Ok(Box::new(wallet))
}

/// Registry for the local wallet implementation.
pub struct Registry;

impl relay_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl crate::AccountRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	const MNEMONIC: &str = "test test test test test test test test test test test junk";

	fn table(src: &str) -> toml::Value {
		toml::from_str::<toml::Table>(src).map(toml::Value::Table).unwrap()
	}

	#[tokio::test]
	async fn test_mnemonic_derives_first_address_by_default() {
		let account = create_account(&table(&format!("mnemonic = \"{MNEMONIC}\""))).unwrap();
		assert_eq!(
			account.address().await.unwrap(),
			address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
		);
	}

	#[tokio::test]
	async fn test_mnemonic_index_selects_account() {
		let account =
			create_account(&table(&format!("mnemonic = \"{MNEMONIC}\"\nindex = 1"))).unwrap();
		assert_eq!(
			account.address().await.unwrap(),
			address!("70997970C51812dc3A010C7d01b50e0d17dc79C8")
		);
	}

	#[tokio::test]
	async fn test_private_key_without_prefix() {
		let account = create_account(&table(
			"private_key = \"ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80\"",
		))
		.unwrap();
		assert_eq!(
			account.address().await.unwrap(),
			address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
		);
	}

	#[test]
	fn test_schema_requires_exactly_one_key_source() {
		assert!(matches!(
			LocalWalletSchema::validate_config(&table("index = 0")),
			Err(ValidationError::MissingField(_))
		));

		let both = table(&format!(
			"mnemonic = \"{MNEMONIC}\"\nprivate_key = \"0x{}\"",
			"11".repeat(32)
		));
		assert!(LocalWalletSchema::validate_config(&both).is_err());
	}

	#[test]
	fn test_schema_rejects_malformed_values() {
		assert!(LocalWalletSchema::validate_config(&table("private_key = \"0x1234\"")).is_err());
		assert!(LocalWalletSchema::validate_config(&table("mnemonic = \"one two three\"")).is_err());
		assert!(create_account(&table(&format!("mnemonic = \"{MNEMONIC}\"\nindex = -1"))).is_err());
	}

	#[test]
	fn test_blank_mnemonic_is_invalid_key() {
		let result = LocalWallet::from_mnemonic(&SecretString::from("   "), 0);
		assert!(matches!(result, Err(AccountError::InvalidKey(msg)) if msg == "Mnemonic is empty"));
	}
}
