//! Claim event handling shared by the HTTP server and the invoke command.

use relay_core::{RelayEngine, RelayError};
use relay_types::{ClaimEventPayload, ClaimRequest, RelayResponse};

/// Relays one decoded claim event.
///
/// Malformed fields and every relay outcome are answered with an envelope.
/// Only an unreachable ledger is returned as an error.
pub async fn handle_event(
	engine: &RelayEngine,
	payload: &ClaimEventPayload,
) -> Result<RelayResponse, RelayError> {
	let claim = match ClaimRequest::try_from(payload) {
		Ok(claim) => claim,
		Err(e) => {
			tracing::warn!(error = %e, "Rejected malformed claim event");
			return Ok(RelayResponse::malformed(&e));
		},
	};

	let outcome = engine.relay_claim(&claim).await?;
	Ok(RelayResponse::from(&outcome))
}

/// Parses and relays one raw JSON claim event.
pub async fn handle_raw_event(
	engine: &RelayEngine,
	body: &[u8],
) -> Result<RelayResponse, RelayError> {
	match serde_json::from_slice::<ClaimEventPayload>(body) {
		Ok(payload) => handle_event(engine, &payload).await,
		Err(e) => {
			tracing::warn!(error = %e, "Rejected undecodable claim event");
			Ok(RelayResponse::invalid_event(format!("Invalid event: {}", e)))
		},
	}
}

/// Envelope returned when the ledger could not be consulted.
pub fn unavailable_response(error: &RelayError) -> RelayResponse {
	RelayResponse::unavailable(error.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::factory_registry::build_relay_from_config;
	use relay_account::codec;
	use relay_types::parse_item_id;

	pub const CLAIMER_KEY: &str =
		"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	pub const FINDER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
	const RELAY_KEY: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";
	const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

	pub async fn memory_engine() -> RelayEngine {
		let config = format!(
			r#"
[relay]
id = "service-test"

[network]
rpc_url = "http://127.0.0.1:8545"
contract_address = "{CONTRACT}"

[account]
primary = "local"
[account.implementations.local]
private_key = "{RELAY_KEY}"

[ledger]
primary = "memory"
[[ledger.implementations.memory.items]]
item_id = "0x1"
claimer = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
reward = 1000
"#
		);
		build_relay_from_config(config.parse().unwrap()).await.unwrap()
	}

	/// Event for item `0x1` signed with `key`.
	pub fn signed_event(key: &str, description: &str) -> serde_json::Value {
		let item_id = parse_item_id("0x1").unwrap();
		let signature =
			codec::sign_claim(key, &item_id, &FINDER.parse().unwrap(), description).unwrap();
		serde_json::json!({
			"goodID": "0x1",
			"finder": FINDER,
			"descriptionLink": description,
			"sig": {
				"v": signature.v(),
				"r": signature.r().to_string(),
				"s": signature.s().to_string(),
			}
		})
	}

	#[tokio::test]
	async fn test_claimer_signed_event_is_submitted() {
		let engine = memory_engine().await;
		let event = signed_event(CLAIMER_KEY, "desc");

		let response = handle_raw_event(&engine, event.to_string().as_bytes())
			.await
			.unwrap();
		assert_eq!(response.status_code, 200);
		assert!(response.body.success);
		assert!(response.body.tx_hash.is_some());

		let events = engine
			.claim_events(&parse_item_id("0x1").unwrap(), Some(FINDER.parse().unwrap()))
			.await
			.unwrap();
		assert_eq!(events.len(), 1);
	}

	#[tokio::test]
	async fn test_foreign_signature_is_rejected() {
		let engine = memory_engine().await;
		let event = signed_event(RELAY_KEY, "desc");

		let response = handle_raw_event(&engine, event.to_string().as_bytes())
			.await
			.unwrap();
		assert_eq!(response.status_code, 400);
		assert!(!response.body.success);
		assert_eq!(response.body.reason.as_deref(), Some("Invalid signature"));
	}

	#[tokio::test]
	async fn test_malformed_events() {
		let engine = memory_engine().await;

		let response = handle_raw_event(&engine, b"{not json").await.unwrap();
		assert_eq!(response.status_code, 400);
		assert!(response
			.body
			.reason
			.unwrap_or_default()
			.starts_with("Invalid event"));

		let mut event = signed_event(CLAIMER_KEY, "desc");
		event["sig"]["v"] = serde_json::json!(30);
		let response = handle_raw_event(&engine, event.to_string().as_bytes())
			.await
			.unwrap();
		assert_eq!(response.status_code, 400);
		assert!(response.body.reason.unwrap_or_default().contains("recovery id"));
	}

	#[test]
	fn test_unavailable_envelope() {
		let response =
			unavailable_response(&RelayError::LedgerUnavailable("connection refused".into()));
		assert_eq!(response.status_code, 503);
		assert!(!response.body.success);
	}
}
