//! Meta-transaction relay state machine.
//!
//! Each claim moves through three states and ends in exactly one outcome:
//!
//! 1. Received: the claim digest is computed and the signer recovered for
//!    the logs. Nothing is rejected locally; the ledger is authoritative.
//! 2. Validating: the ledger dry-runs the claim as the relay account. A
//!    reported reason (or a revert) ends the call as `Rejected` and nothing
//!    is submitted.
//! 3. Submitting: the claim transaction is sent from the relay account.
//!    Success yields `Submitted`; any failure yields `SubmitFailed`.
//!
//! There are no retries. Only an unreachable ledger during validation is
//! surfaced as an error.

use relay_account::codec;
use relay_ledger::{LedgerError, LedgerService};
use relay_types::{truncate_id, Address, ClaimRequest, ContractReference, RelayOutcome};
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a relay call.
#[derive(Debug, Error)]
pub enum RelayError {
	/// The ledger could not be consulted, so the claim was neither accepted
	/// nor rejected.
	#[error("Ledger unavailable: {0}")]
	LedgerUnavailable(String),
}

/// Relays claims to one contract from one relay account.
///
/// Holds no per-claim state, so a single instance serves concurrent calls.
pub struct ClaimRelay {
	ledger: Arc<LedgerService>,
	relay_account: Address,
	contract: ContractReference,
}

impl ClaimRelay {
	pub fn new(
		ledger: Arc<LedgerService>,
		relay_account: Address,
		contract: ContractReference,
	) -> Self {
		Self {
			ledger,
			relay_account,
			contract,
		}
	}

	pub fn contract(&self) -> &ContractReference {
		&self.contract
	}

	pub fn relay_account(&self) -> Address {
		self.relay_account
	}

	/// Processes one claim.
	pub async fn relay(&self, claim: &ClaimRequest) -> Result<RelayOutcome, RelayError> {
		let item_id = truncate_id(&claim.item_id().to_string());
		let finder = claim.finder();

		let digest = codec::encode(claim.item_id(), finder, claim.description_link());
		match codec::recover(&digest, claim.signature()) {
			Ok(signer) => tracing::debug!(
				item_id = %item_id,
				finder = %finder,
				signer = %signer,
				"Received claim"
			),
			Err(e) => tracing::debug!(
				item_id = %item_id,
				finder = %finder,
				error = %e,
				"Received claim with unrecoverable signature"
			),
		}

		let validation = self
			.ledger
			.validate_claim(&self.contract, claim, self.relay_account)
			.await;
		let rejection = match validation {
			Ok(reason) => reason,
			Err(LedgerError::Reverted(reason)) => Some(reason),
			Err(e) => {
				tracing::error!(item_id = %item_id, error = %e, "Claim validation failed");
				return Err(RelayError::LedgerUnavailable(e.to_string()));
			},
		};
		if let Some(reason) = rejection {
			tracing::info!(
				item_id = %item_id,
				finder = %finder,
				status = "rejected",
				reason = %reason,
				"Claim rejected by ledger"
			);
			return Ok(RelayOutcome::rejected(reason));
		}

		match self
			.ledger
			.submit_claim(&self.contract, claim, self.relay_account)
			.await
		{
			Ok(hash) => {
				tracing::info!(
					item_id = %item_id,
					finder = %finder,
					status = "submitted",
					tx_hash = %hash,
					"Claim submitted"
				);
				Ok(RelayOutcome::submitted(hash))
			},
			Err(e) => {
				tracing::warn!(
					item_id = %item_id,
					finder = %finder,
					status = "submit_failed",
					error = %e,
					"Claim submission failed"
				);
				Ok(RelayOutcome::submit_failed(e.to_string()))
			},
		}
	}
}
