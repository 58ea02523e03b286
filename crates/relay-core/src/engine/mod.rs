//! Relay engine.
//!
//! Owns the configured services and the [`ClaimRelay`] bound to the resolved
//! contract. Built once at start-up and shared behind an `Arc`.

use crate::relay::{ClaimRelay, RelayError};
use relay_config::Config;
use relay_ledger::{LedgerError, LedgerService};
use relay_types::{Address, ClaimEvent, ClaimRequest, ContractReference, ItemId, RelayOutcome};
use std::sync::Arc;

pub struct RelayEngine {
	config: Config,
	ledger: Arc<LedgerService>,
	relay: ClaimRelay,
}

impl RelayEngine {
	pub fn new(
		config: Config,
		ledger: Arc<LedgerService>,
		relay: ClaimRelay,
	) -> Self {
		Self {
			config,
			ledger,
			relay,
		}
	}

	/// Relays one claim to the configured contract.
	pub async fn relay_claim(&self, claim: &ClaimRequest) -> Result<RelayOutcome, RelayError> {
		self.relay.relay(claim).await
	}

	/// Claims recorded for `item_id`, optionally for one finder only.
	pub async fn claim_events(
		&self,
		item_id: &ItemId,
		finder: Option<Address>,
	) -> Result<Vec<ClaimEvent>, LedgerError> {
		self.ledger
			.claim_events(self.relay.contract(), item_id, finder)
			.await
	}

	pub fn contract(&self) -> &ContractReference {
		self.relay.contract()
	}

	pub fn relay_address(&self) -> Address {
		self.relay.relay_account()
	}

	pub fn config(&self) -> &Config {
		&self.config
	}
}
