//! In-process ledger.
//!
//! Stands in for a deployed Recover contract during tests and local runs. It
//! keeps an item registry and the list of recorded claims, and applies the
//! contract's meta-transaction checks: the item must exist, the finder must
//! be a real address, the signature must recover to the item's claimer, and
//! a finder may claim an item only once.

use crate::{LedgerError, LedgerInterface};
use alloy_primitives::{keccak256, Address, U256};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use relay_account::codec;
use relay_config::NetworkConfig;
use relay_types::{
	parse_address, parse_item_id, ClaimEvent, ClaimRequest, ConfigSchema, ContractReference,
	Field, FieldType, ItemId, Schema, TransactionHash, ValidationError,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Chain id reported when the network section does not name one.
pub const DEFAULT_CHAIN_ID: u64 = 31337;

pub const ITEM_NOT_FOUND: &str = "Item does not exist";
pub const ZERO_FINDER: &str = "Finder address cannot be zero";
pub const INVALID_SIGNATURE: &str = "Invalid signature";
pub const ALREADY_CLAIMED: &str = "Item already claimed by this finder";

/// A registered item.
#[derive(Debug, Clone)]
pub struct MemoryItem {
	/// Account whose key authorizes claims on this item.
	pub claimer: Address,
	pub description_link: String,
	/// Escrowed reward in wei.
	pub reward: U256,
	/// Seconds the reward stays locked after a claim is accepted.
	pub timeout_locked: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
	items: HashMap<ItemId, MemoryItem>,
	claims: Vec<ClaimEvent>,
}

impl LedgerState {
	fn check(&self, claim: &ClaimRequest) -> Option<&'static str> {
		let Some(item) = self.items.get(claim.item_id()) else {
			return Some(ITEM_NOT_FOUND);
		};
		if claim.finder().is_zero() {
			return Some(ZERO_FINDER);
		}

		let digest = codec::encode(claim.item_id(), claim.finder(), claim.description_link());
		match codec::recover(&digest, claim.signature()) {
			Ok(signer) if signer == item.claimer => {},
			_ => return Some(INVALID_SIGNATURE),
		}

		let already = self
			.claims
			.iter()
			.any(|c| c.item_id == *claim.item_id() && c.finder == *claim.finder());
		if already {
			return Some(ALREADY_CLAIMED);
		}
		None
	}
}

/// Ledger kept entirely in memory.
pub struct MemoryLedger {
	contract: ContractReference,
	state: RwLock<LedgerState>,
}

impl MemoryLedger {
	/// Creates an empty ledger hosting the contract at `address`.
	pub fn new(address: Address, chain_id: u64) -> Self {
		Self {
			contract: ContractReference { address, chain_id },
			state: RwLock::new(LedgerState::default()),
		}
	}

	/// Creates a ledger with items already registered.
	pub fn with_items(
		address: Address,
		chain_id: u64,
		items: impl IntoIterator<Item = (ItemId, MemoryItem)>,
	) -> Self {
		Self {
			contract: ContractReference { address, chain_id },
			state: RwLock::new(LedgerState {
				items: items.into_iter().collect(),
				claims: Vec::new(),
			}),
		}
	}

	/// Registers a lost item, replacing any item with the same id.
	pub async fn add_item(
		&self,
		item_id: ItemId,
		claimer: Address,
		description_link: impl Into<String>,
		reward: U256,
		timeout_locked: u64,
	) {
		let item = MemoryItem {
			claimer,
			description_link: description_link.into(),
			reward,
			timeout_locked,
		};
		self.state.write().await.items.insert(item_id, item);
	}

	fn ensure_contract(&self, contract: &ContractReference) -> Result<(), LedgerError> {
		if contract.address != self.contract.address {
			return Err(LedgerError::ContractNotFound(contract.address));
		}
		Ok(())
	}
}

/// Configuration schema for MemoryLedger.
pub struct MemoryLedgerSchema;

impl ConfigSchema for MemoryLedgerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let item = Schema::new(
			vec![
				Field::new("item_id", FieldType::String)
					.with_validator(|v| check_hex(v, |s| parse_item_id(s).map(|_| ()))),
				Field::new("claimer", FieldType::String)
					.with_validator(|v| check_hex(v, |s| parse_address("claimer", s).map(|_| ()))),
			],
			vec![
				Field::new("description_link", FieldType::String),
				Field::new(
					"reward",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
				Field::new(
					"timeout_locked",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
			],
		);
		let schema = Schema::new(
			vec![],
			vec![Field::new("items", FieldType::Array(Box::new(FieldType::Table(item))))],
		);
		schema.validate(config)
	}
}

fn check_hex<F, E>(value: &toml::Value, parse: F) -> Result<(), String>
where
	F: Fn(&str) -> Result<(), E>,
	E: std::fmt::Display,
{
	parse(value.as_str().unwrap_or_default()).map_err(|e| e.to_string())
}

#[async_trait]
impl LedgerInterface for MemoryLedger {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryLedgerSchema)
	}

	async fn lookup_contract(&self, address: Address) -> Result<ContractReference, LedgerError> {
		if address != self.contract.address {
			return Err(LedgerError::ContractNotFound(address));
		}
		Ok(self.contract)
	}

	async fn validate_claim(
		&self,
		contract: &ContractReference,
		claim: &ClaimRequest,
		_as_account: Address,
	) -> Result<Option<String>, LedgerError> {
		self.ensure_contract(contract)?;
		let state = self.state.read().await;
		Ok(state.check(claim).map(str::to_string))
	}

	async fn submit_claim(
		&self,
		contract: &ContractReference,
		claim: &ClaimRequest,
		as_account: Address,
	) -> Result<TransactionHash, LedgerError> {
		self.ensure_contract(contract)?;
		let mut state = self.state.write().await;
		if let Some(reason) = state.check(claim) {
			return Err(LedgerError::Reverted(reason.to_string()));
		}

		let claim_id = state.claims.len() as u64;
		let hash = keccak256(
			(
				self.contract.address,
				*claim.item_id(),
				*claim.finder(),
				as_account,
				U256::from(claim_id),
			)
				.abi_encode(),
		);
		state.claims.push(ClaimEvent {
			claim_id,
			item_id: *claim.item_id(),
			finder: *claim.finder(),
			transaction_hash: Some(TransactionHash(hash)),
			block_number: Some(claim_id + 1),
		});

		tracing::debug!(claim_id, "Recorded claim");
		Ok(TransactionHash(hash))
	}

	async fn claim_events(
		&self,
		contract: &ContractReference,
		item_id: &ItemId,
		finder: Option<Address>,
	) -> Result<Vec<ClaimEvent>, LedgerError> {
		self.ensure_contract(contract)?;
		let state = self.state.read().await;
		Ok(state
			.claims
			.iter()
			.filter(|c| c.item_id == *item_id && finder.is_none_or(|f| c.finder == f))
			.cloned()
			.collect())
	}
}

/// Factory function to create a memory ledger from configuration.
///
/// Items listed under `items` are registered up front:
///
/// ```toml
/// [[ledger.implementations.memory.items]]
/// item_id = "0x01"
/// claimer = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
/// reward = 1000
/// ```
pub fn create_ledger(
	config: &toml::Value,
	network: &NetworkConfig,
	_signer: &PrivateKeySigner,
) -> Result<Box<dyn LedgerInterface>, LedgerError> {
	MemoryLedgerSchema
		.validate(config)
		.map_err(|e| LedgerError::Configuration(format!("Invalid configuration: {}", e)))?;

	let mut items = Vec::new();
	for entry in config
		.get("items")
		.and_then(|v| v.as_array())
		.into_iter()
		.flatten()
	{
		let field = |key: &str| entry.get(key).and_then(|v| v.as_str()).unwrap_or_default();
		let integer = |key: &str| entry.get(key).and_then(|v| v.as_integer()).unwrap_or(0) as u64;

		let item_id =
			parse_item_id(field("item_id")).map_err(|e| LedgerError::Configuration(e.to_string()))?;
		let claimer = parse_address("claimer", field("claimer"))
			.map_err(|e| LedgerError::Configuration(e.to_string()))?;
		items.push((
			item_id,
			MemoryItem {
				claimer,
				description_link: field("description_link").to_string(),
				reward: U256::from(integer("reward")),
				timeout_locked: integer("timeout_locked"),
			},
		));
	}

	tracing::debug!(items = items.len(), "Created memory ledger");
	Ok(Box::new(MemoryLedger::with_items(
		network.contract_address,
		network.chain_id.unwrap_or(DEFAULT_CHAIN_ID),
		items,
	)))
}

/// Registry for the memory ledger implementation.
pub struct Registry;

impl relay_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::LedgerFactory;

	fn factory() -> Self::Factory {
		create_ledger
	}
}

impl crate::LedgerRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use relay_types::ClaimSignature;

	const CLAIMER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const CLAIMER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
	const FINDER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
	const FINDER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
	const CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
	const RELAY: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

	fn item_id() -> ItemId {
		parse_item_id("0x1").unwrap()
	}

	fn claim(key: &str, finder: Address, description: &str) -> ClaimRequest {
		let signature = codec::sign_claim(key, &item_id(), &finder, description).unwrap();
		ClaimRequest::new(item_id(), finder, description, signature)
	}

	async fn ledger() -> (MemoryLedger, ContractReference) {
		let ledger = MemoryLedger::new(CONTRACT, DEFAULT_CHAIN_ID);
		ledger
			.add_item(item_id(), CLAIMER, "ipfs://lost-wallet", U256::from(1_000u64), 3600)
			.await;
		let contract = ledger.lookup_contract(CONTRACT).await.unwrap();
		(ledger, contract)
	}

	#[tokio::test]
	async fn test_claimer_signed_claim_is_recorded_once() {
		let (ledger, contract) = ledger().await;
		let claim = claim(CLAIMER_KEY, FINDER, "desc");

		assert_eq!(ledger.validate_claim(&contract, &claim, RELAY).await.unwrap(), None);
		let hash = ledger.submit_claim(&contract, &claim, RELAY).await.unwrap();

		let events = ledger
			.claim_events(&contract, &item_id(), Some(FINDER))
			.await
			.unwrap();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].finder, FINDER);
		assert_eq!(events[0].transaction_hash, Some(hash));

		assert_eq!(
			ledger.validate_claim(&contract, &claim, RELAY).await.unwrap(),
			Some(ALREADY_CLAIMED.to_string())
		);
		assert!(matches!(
			ledger.submit_claim(&contract, &claim, RELAY).await,
			Err(LedgerError::Reverted(reason)) if reason == ALREADY_CLAIMED
		));
	}

	#[tokio::test]
	async fn test_non_claimer_signature_is_invalid() {
		let (ledger, contract) = ledger().await;
		let claim = claim(FINDER_KEY, FINDER, "desc");

		assert_eq!(
			ledger.validate_claim(&contract, &claim, RELAY).await.unwrap(),
			Some(INVALID_SIGNATURE.to_string())
		);
		assert!(ledger
			.claim_events(&contract, &item_id(), None)
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_signature_bound_to_finder() {
		let (ledger, contract) = ledger().await;
		let signed = claim(CLAIMER_KEY, FINDER, "desc");
		let redirected = ClaimRequest::new(item_id(), RELAY, "desc", *signed.signature());

		assert_eq!(
			ledger.validate_claim(&contract, &redirected, RELAY).await.unwrap(),
			Some(INVALID_SIGNATURE.to_string())
		);
	}

	#[tokio::test]
	async fn test_unknown_item_and_zero_finder() {
		let (ledger, contract) = ledger().await;
		let signature = ClaimSignature::new(27, Default::default(), Default::default()).unwrap();

		let unknown = ClaimRequest::new(parse_item_id("0x2").unwrap(), FINDER, "d", signature);
		assert_eq!(
			ledger.validate_claim(&contract, &unknown, RELAY).await.unwrap(),
			Some(ITEM_NOT_FOUND.to_string())
		);

		let zero = ClaimRequest::new(item_id(), Address::ZERO, "d", signature);
		assert_eq!(
			ledger.validate_claim(&contract, &zero, RELAY).await.unwrap(),
			Some(ZERO_FINDER.to_string())
		);
	}

	#[tokio::test]
	async fn test_unknown_contract() {
		let (ledger, _) = ledger().await;
		assert!(matches!(
			ledger.lookup_contract(RELAY).await,
			Err(LedgerError::ContractNotFound(addr)) if addr == RELAY
		));
	}

	#[tokio::test]
	async fn test_factory_registers_configured_items() {
		let config = toml::from_str::<toml::Table>(&format!(
			"[[items]]\nitem_id = \"0x1\"\nclaimer = \"{CLAIMER}\"\nreward = 1000"
		))
		.map(toml::Value::Table)
		.unwrap();
		let network = NetworkConfig {
			rpc_url: "memory://".to_string(),
			chain_id: None,
			contract_address: CONTRACT,
		};

		let ledger = create_ledger(&config, &network, &PrivateKeySigner::random()).unwrap();
		let contract = ledger.lookup_contract(CONTRACT).await.unwrap();
		assert_eq!(contract.chain_id, DEFAULT_CHAIN_ID);

		let claim = claim(CLAIMER_KEY, FINDER, "desc");
		assert_eq!(ledger.validate_claim(&contract, &claim, RELAY).await.unwrap(), None);
	}

	#[test]
	fn test_schema_rejects_bad_item() {
		let config = toml::from_str::<toml::Table>("[[items]]\nitem_id = \"0x1\"\nclaimer = \"0x12\"")
			.map(toml::Value::Table)
			.unwrap();
		assert!(MemoryLedgerSchema.validate(&config).is_err());
	}
}
