//! Ledger collaborator module for the claim relay.
//!
//! The ledger hosts the Recover contract: item registry, reward escrow and the
//! meta-transaction signature check. The relay only ever talks to it through
//! [`LedgerInterface`], which offers a read-only dry run of a claim, the
//! mutating submission, and a query over emitted `ItemClaimed` events.

use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use relay_config::NetworkConfig;
use relay_types::{
	truncate_id, Address, ClaimEvent, ClaimRequest, ConfigSchema, ContractReference,
	ImplementationRegistry, ItemId, TransactionHash,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod memory;
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
	/// The ledger could not be reached or answered with a transport failure.
	#[error("Ledger unavailable: {0}")]
	Unavailable(String),
	/// The contract rejected the call.
	#[error("Call reverted: {0}")]
	Reverted(String),
	/// No contract is deployed at the given address.
	#[error("Contract not found at {0}")]
	ContractNotFound(Address),
	/// The implementation was misconfigured.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl LedgerError {
	/// Whether the error means the ledger itself could not be reached.
	pub fn is_unavailable(&self) -> bool {
		matches!(self, LedgerError::Unavailable(_))
	}
}

/// Trait defining the interface for ledger implementations.
///
/// Implementations must be safe to share between concurrent relay calls.
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Returns the configuration schema for this ledger implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Resolves the contract deployed at `address`.
	///
	/// Fails with [`LedgerError::ContractNotFound`] when nothing is deployed
	/// there.
	async fn lookup_contract(&self, address: Address) -> Result<ContractReference, LedgerError>;

	/// Dry-runs the claim as `as_account` without changing ledger state.
	///
	/// Returns `None` when the claim would be accepted and `Some(reason)`
	/// when the contract reports it invalid.
	async fn validate_claim(
		&self,
		contract: &ContractReference,
		claim: &ClaimRequest,
		as_account: Address,
	) -> Result<Option<String>, LedgerError>;

	/// Submits the claim as `as_account`, paying for it with that account.
	async fn submit_claim(
		&self,
		contract: &ContractReference,
		claim: &ClaimRequest,
		as_account: Address,
	) -> Result<TransactionHash, LedgerError>;

	/// Lists `ItemClaimed` events for `item_id`, optionally narrowed to one
	/// finder.
	async fn claim_events(
		&self,
		contract: &ContractReference,
		item_id: &ItemId,
		finder: Option<Address>,
	) -> Result<Vec<ClaimEvent>, LedgerError>;
}

/// Type alias for ledger factory functions.
///
/// Receives the implementation's own configuration table, the network
/// section, and the relay account's signer used for transaction signing.
pub type LedgerFactory = fn(
	&toml::Value,
	&NetworkConfig,
	&PrivateKeySigner,
) -> Result<Box<dyn LedgerInterface>, LedgerError>;

/// Registry trait for ledger implementations.
pub trait LedgerRegistry: ImplementationRegistry<Factory = LedgerFactory> {}

/// Get all registered ledger implementations.
///
/// Returns a vector of (name, factory) tuples for all available ledger implementations.
pub fn get_all_implementations() -> Vec<(&'static str, LedgerFactory)> {
	use implementations::{evm::alloy, memory};

	vec![
		(alloy::Registry::NAME, alloy::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Service wrapping the configured ledger implementation.
pub struct LedgerService {
	implementation: Box<dyn LedgerInterface>,
}

impl LedgerService {
	pub fn new(implementation: Box<dyn LedgerInterface>) -> Self {
		Self { implementation }
	}

	pub async fn lookup_contract(
		&self,
		address: Address,
	) -> Result<ContractReference, LedgerError> {
		let contract = self.implementation.lookup_contract(address).await?;
		tracing::info!(
			contract = %contract.address,
			chain_id = contract.chain_id,
			"Resolved claim contract"
		);
		Ok(contract)
	}

	pub async fn validate_claim(
		&self,
		contract: &ContractReference,
		claim: &ClaimRequest,
		as_account: Address,
	) -> Result<Option<String>, LedgerError> {
		self.implementation
			.validate_claim(contract, claim, as_account)
			.await
	}

	pub async fn submit_claim(
		&self,
		contract: &ContractReference,
		claim: &ClaimRequest,
		as_account: Address,
	) -> Result<TransactionHash, LedgerError> {
		self.implementation
			.submit_claim(contract, claim, as_account)
			.await
	}

	pub async fn claim_events(
		&self,
		contract: &ContractReference,
		item_id: &ItemId,
		finder: Option<Address>,
	) -> Result<Vec<ClaimEvent>, LedgerError> {
		let events = self
			.implementation
			.claim_events(contract, item_id, finder)
			.await?;
		tracing::debug!(
			item_id = %truncate_id(&item_id.to_string()),
			count = events.len(),
			"Fetched claim events"
		);
		Ok(events)
	}
}
