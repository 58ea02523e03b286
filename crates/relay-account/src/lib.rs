//! Relay account and claim signature codec.
//!
//! The relay account pays for claim submissions on behalf of finders. This
//! crate loads it from configuration, exposes its address and signer, and
//! provides the codec used to produce and verify claim signatures.

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use relay_types::{Address, ClaimSignature, ConfigSchema, ImplementationRegistry};
use thiserror::Error;

pub mod codec;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

pub use codec::SigningError;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

impl From<SigningError> for AccountError {
	fn from(err: SigningError) -> Self {
		match err {
			SigningError::InvalidKey(msg) => AccountError::InvalidKey(msg),
			SigningError::Failed(msg) => AccountError::SigningFailed(msg),
		}
	}
}

/// Trait defining the interface for account implementations.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the configuration schema for this account implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address the relay submits transactions from.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a 32-byte digest as an EIP-191 personal message.
	async fn sign_digest(&self, digest: &B256) -> Result<ClaimSignature, AccountError>;

	/// Signer handed to the ledger for transaction signing.
	fn signer(&self) -> PrivateKeySigner;
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry trait for account implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered account implementations.
///
/// Returns a vector of (name, factory) tuples for all available account implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service that manages the relay account.
pub struct AccountService {
	/// The underlying account implementation.
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the address associated with the managed account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a digest using the managed account.
	pub async fn sign_digest(&self, digest: &B256) -> Result<ClaimSignature, AccountError> {
		self.implementation.sign_digest(digest).await
	}

	/// Returns the signer used for transaction signing.
	pub fn signer(&self) -> PrivateKeySigner {
		self.implementation.signer()
	}
}
