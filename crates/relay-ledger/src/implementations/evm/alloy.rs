//! EVM ledger implementation backed by Alloy.
//!
//! Talks to a deployed Recover contract over HTTP JSON-RPC. The relay wallet
//! is installed on the provider together with the recommended fillers, so
//! nonce, gas and chain id are filled in by the provider when submitting.

use crate::{LedgerError, LedgerInterface};
use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, B256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{Filter, TransactionRequest};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol, SolCall, SolEvent};
use alloy_transport::{RpcError, TransportError};
use alloy_transport_http::Http;
use async_trait::async_trait;
use relay_config::NetworkConfig;
use relay_types::{
	truncate_id, ClaimEvent, ClaimRequest, ConfigSchema, ContractReference, Field, FieldType,
	ItemId, Schema, TransactionHash, ValidationError,
};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 7;
const DEFAULT_RECEIPT_TIMEOUT_SECONDS: u64 = 120;

// Subset of the Recover contract ABI used by the relay.
sol! {
	interface IRecover {
		/// Dry run of `claimMetaTransaction`; returns an empty string when valid.
		function validateClaimMetaTransaction(
			bytes32 _itemID,
			address _finder,
			string _descriptionLink,
			uint8 _v,
			bytes32 _r,
			bytes32 _s
		) external view returns (string memory);

		/// Records a claim signed by the item's claimer key.
		function claimMetaTransaction(
			bytes32 _itemID,
			address _finder,
			string _descriptionLink,
			uint8 _v,
			bytes32 _r,
			bytes32 _s
		) external;

		/// Emitted once per recorded claim.
		event ItemClaimed(bytes32 indexed _itemID, address indexed _finder, uint256 _claimID);
	}
}

use IRecover::{claimMetaTransactionCall, validateClaimMetaTransactionCall, ItemClaimed};

/// Alloy-based ledger implementation.
pub struct AlloyLedger {
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	/// Chain id the configuration expects, checked on contract lookup.
	expected_chain_id: Option<u64>,
	/// Whether submission waits for the transaction to be mined.
	wait_for_receipt: bool,
	receipt_timeout: Duration,
}

impl AlloyLedger {
	/// Creates a ledger client for the configured endpoint.
	///
	/// No request is sent until the first call.
	pub fn new(
		network: &NetworkConfig,
		signer: PrivateKeySigner,
		poll_interval: Duration,
		wait_for_receipt: bool,
		receipt_timeout: Duration,
	) -> Result<Self, LedgerError> {
		let url: reqwest::Url = network.rpc_url.parse().map_err(|e| {
			LedgerError::Configuration(format!("Invalid RPC URL {}: {}", network.rpc_url, e))
		})?;

		let wallet = EthereumWallet::from(signer.with_chain_id(network.chain_id));

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);

		provider.client().set_poll_interval(poll_interval);

		Ok(Self {
			provider: Arc::new(provider) as Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
			expected_chain_id: network.chain_id,
			wait_for_receipt,
			receipt_timeout,
		})
	}
}

/// Maps a JSON-RPC failure onto the ledger error taxonomy.
///
/// An error response from the node means the call itself was refused
/// (typically a revert); anything else means the node was not reached.
fn map_transport_error(err: TransportError) -> LedgerError {
	match err {
		RpcError::ErrorResp(payload) => LedgerError::Reverted(payload.message.to_string()),
		other => LedgerError::Unavailable(other.to_string()),
	}
}

/// Decodes the `string` returned by the validation call. Empty means valid.
fn decode_validation_result(output: &[u8]) -> Result<Option<String>, LedgerError> {
	let reason = validateClaimMetaTransactionCall::abi_decode_returns(output, true)
		.map_err(|e| LedgerError::Reverted(format!("Undecodable validation result: {}", e)))?
		._0;

	Ok(if reason.is_empty() { None } else { Some(reason) })
}

/// The transaction is already broadcast, so the hash stays in the message.
fn receipt_error(tx_hash: B256, err: impl std::fmt::Display) -> LedgerError {
	LedgerError::Unavailable(format!(
		"Claim transaction {} was broadcast but its receipt was not obtained: {}",
		tx_hash, err
	))
}

fn claim_request(
	contract: &ContractReference,
	as_account: Address,
	input: Vec<u8>,
) -> TransactionRequest {
	TransactionRequest::default()
		.from(as_account)
		.to(contract.address)
		.input(input.into())
}

/// Configuration schema for AlloyLedger.
pub struct AlloyLedgerSchema;

impl AlloyLedgerSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for AlloyLedgerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"poll_interval_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new("wait_for_receipt", FieldType::Boolean),
				Field::new(
					"receipt_timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(3600),
					},
				),
			],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl LedgerInterface for AlloyLedger {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyLedgerSchema)
	}

	async fn lookup_contract(&self, address: Address) -> Result<ContractReference, LedgerError> {
		let code = self
			.provider
			.get_code_at(address)
			.await
			.map_err(map_transport_error)?;
		if code.is_empty() {
			return Err(LedgerError::ContractNotFound(address));
		}

		let chain_id = self
			.provider
			.get_chain_id()
			.await
			.map_err(map_transport_error)?;
		if let Some(expected) = self.expected_chain_id {
			if expected != chain_id {
				return Err(LedgerError::Configuration(format!(
					"Endpoint serves chain {} but chain {} is configured",
					chain_id, expected
				)));
			}
		}

		Ok(ContractReference { address, chain_id })
	}

	async fn validate_claim(
		&self,
		contract: &ContractReference,
		claim: &ClaimRequest,
		as_account: Address,
	) -> Result<Option<String>, LedgerError> {
		let signature = claim.signature();
		let call = validateClaimMetaTransactionCall {
			_itemID: *claim.item_id(),
			_finder: *claim.finder(),
			_descriptionLink: claim.description_link().to_string(),
			_v: signature.v(),
			_r: signature.r(),
			_s: signature.s(),
		};

		let output = self
			.provider
			.call(&claim_request(contract, as_account, call.abi_encode()))
			.await
			.map_err(map_transport_error)?;

		decode_validation_result(&output)
	}

	async fn submit_claim(
		&self,
		contract: &ContractReference,
		claim: &ClaimRequest,
		as_account: Address,
	) -> Result<TransactionHash, LedgerError> {
		let signature = claim.signature();
		let call = claimMetaTransactionCall {
			_itemID: *claim.item_id(),
			_finder: *claim.finder(),
			_descriptionLink: claim.description_link().to_string(),
			_v: signature.v(),
			_r: signature.r(),
			_s: signature.s(),
		};

		let pending = self
			.provider
			.send_transaction(claim_request(contract, as_account, call.abi_encode()))
			.await
			.map_err(map_transport_error)?;

		let tx_hash = *pending.tx_hash();
		tracing::info!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			chain_id = contract.chain_id,
			"Submitted claim transaction"
		);

		if self.wait_for_receipt {
			let receipt = pending
				.with_timeout(Some(self.receipt_timeout))
				.get_receipt()
				.await
				.map_err(|e| receipt_error(tx_hash, e))?;
			if !receipt.status() {
				return Err(LedgerError::Reverted(format!(
					"Claim transaction {} reverted",
					tx_hash
				)));
			}
		}

		Ok(TransactionHash(tx_hash))
	}

	async fn claim_events(
		&self,
		contract: &ContractReference,
		item_id: &ItemId,
		finder: Option<Address>,
	) -> Result<Vec<ClaimEvent>, LedgerError> {
		let mut filter = Filter::new()
			.address(contract.address)
			.event_signature(ItemClaimed::SIGNATURE_HASH)
			.topic1(*item_id)
			.from_block(0u64);
		if let Some(finder) = finder {
			filter = filter.topic2(finder.into_word());
		}

		let logs = self
			.provider
			.get_logs(&filter)
			.await
			.map_err(map_transport_error)?;

		logs.iter()
			.map(|log| {
				let event = ItemClaimed::decode_log(&log.inner, true).map_err(|e| {
					LedgerError::Unavailable(format!("Failed to decode ItemClaimed event: {}", e))
				})?;
				Ok(ClaimEvent {
					claim_id: event._claimID.saturating_to::<u64>(),
					item_id: event._itemID,
					finder: event._finder,
					transaction_hash: log.transaction_hash.map(TransactionHash),
					block_number: log.block_number,
				})
			})
			.collect()
	}
}

/// Factory function to create an Alloy ledger from configuration.
///
/// Configuration parameters:
/// - `poll_interval_seconds`: provider polling interval (default 7)
/// - `wait_for_receipt`: wait for the claim transaction to be mined (default true)
/// - `receipt_timeout_seconds`: how long to wait for the receipt (default 120)
pub fn create_ledger(
	config: &toml::Value,
	network: &NetworkConfig,
	signer: &PrivateKeySigner,
) -> Result<Box<dyn LedgerInterface>, LedgerError> {
	AlloyLedgerSchema::validate_config(config)
		.map_err(|e| LedgerError::Configuration(format!("Invalid configuration: {}", e)))?;

	let seconds = |key: &str, default: u64| {
		config
			.get(key)
			.and_then(|v| v.as_integer())
			.map(|v| v as u64)
			.unwrap_or(default)
	};
	let wait_for_receipt = config
		.get("wait_for_receipt")
		.and_then(|v| v.as_bool())
		.unwrap_or(true);

	let ledger = AlloyLedger::new(
		network,
		signer.clone(),
		Duration::from_secs(seconds("poll_interval_seconds", DEFAULT_POLL_INTERVAL_SECONDS)),
		wait_for_receipt,
		Duration::from_secs(seconds("receipt_timeout_seconds", DEFAULT_RECEIPT_TIMEOUT_SECONDS)),
	)?;

	Ok(Box::new(ledger))
}

/// Registry for the Alloy ledger implementation.
pub struct Registry;

impl relay_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
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
	use alloy_transport::TransportErrorKind;

	fn network(rpc_url: &str) -> NetworkConfig {
		NetworkConfig {
			rpc_url: rpc_url.to_string(),
			chain_id: Some(31337),
			contract_address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
		}
	}

	fn table(src: &str) -> toml::Value {
		toml::from_str::<toml::Table>(src).map(toml::Value::Table).unwrap()
	}

	#[test]
	fn test_validate_call_encoding_matches_selector() {
		let call = validateClaimMetaTransactionCall {
			_itemID: B256::repeat_byte(0x01),
			_finder: Address::ZERO,
			_descriptionLink: "desc".to_string(),
			_v: 27,
			_r: B256::ZERO,
			_s: B256::ZERO,
		};
		let data = call.abi_encode();
		assert_eq!(&data[..4], validateClaimMetaTransactionCall::SELECTOR.as_slice());
		// selector + six head words + string length word + one data word
		assert_eq!(data.len(), 4 + 8 * 32);
	}

	#[test]
	fn test_validation_result_decoding() {
		let encoded = ("Invalid signature".to_string(),);
		let data = alloy_sol_types::SolValue::abi_encode_params(&encoded);
		assert_eq!(
			decode_validation_result(&data).unwrap(),
			Some("Invalid signature".to_string())
		);

		let empty = alloy_sol_types::SolValue::abi_encode_params(&(String::new(),));
		assert_eq!(decode_validation_result(&empty).unwrap(), None);
	}

	#[test]
	fn test_undecodable_validation_result_is_reverted() {
		// empty return data, as from an address without the function
		assert!(matches!(
			decode_validation_result(&[]),
			Err(LedgerError::Reverted(msg)) if msg.starts_with("Undecodable validation result")
		));
		assert!(matches!(
			decode_validation_result(&[0xde, 0xad, 0xbe]),
			Err(LedgerError::Reverted(_))
		));
	}

	#[test]
	fn test_error_response_maps_to_reverted() {
		let err: TransportError = RpcError::ErrorResp(
			serde_json::from_str(
				r#"{"code":3,"message":"execution reverted: Invalid signature","data":"0x08c379a0"}"#,
			)
			.unwrap(),
		);
		match map_transport_error(err) {
			LedgerError::Reverted(msg) => {
				assert_eq!(msg, "execution reverted: Invalid signature")
			},
			other => panic!("expected Reverted, got {other:?}"),
		}
	}

	#[test]
	fn test_receipt_error_names_transaction() {
		let tx_hash = B256::repeat_byte(0xab);
		let err = receipt_error(tx_hash, "timed out");
		assert!(err.is_unavailable());
		assert!(err.to_string().contains(&tx_hash.to_string()));
	}

	#[test]
	fn test_transport_failures_map_to_unavailable() {
		let err: TransportError = RpcError::local_usage_str("connection refused");
		assert!(map_transport_error(err).is_unavailable());

		let err: TransportError = TransportErrorKind::custom_str("timed out");
		assert!(map_transport_error(err).is_unavailable());
	}

	#[test]
	fn test_schema_bounds() {
		assert!(AlloyLedgerSchema::validate_config(&table("poll_interval_seconds = 7")).is_ok());
		assert!(AlloyLedgerSchema::validate_config(&table("poll_interval_seconds = 0")).is_err());
		assert!(AlloyLedgerSchema::validate_config(&table("wait_for_receipt = \"yes\"")).is_err());
	}

	#[test]
	fn test_factory_rejects_bad_url() {
		let signer = PrivateKeySigner::random();
		let result = create_ledger(&table(""), &network("not a url"), &signer);
		assert!(matches!(result, Err(LedgerError::Configuration(_))));
	}

	#[tokio::test]
	async fn test_factory_builds_without_contacting_node() {
		let signer = PrivateKeySigner::random();
		let ledger = create_ledger(
			&table("poll_interval_seconds = 2\nwait_for_receipt = false"),
			&network("http://127.0.0.1:1"),
			&signer,
		);
		assert!(ledger.is_ok());
	}
}
