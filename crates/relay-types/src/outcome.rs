//! Relay outcome types.
//!
//! Every processed claim yields exactly one outcome. Domain-level failures are
//! carried as data so callers can render them without special-casing errors.

use crate::TransactionHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason attached to every submission failure.
pub const SUBMISSION_FAILED_REASON: &str = "submission failed";

/// Terminal state of a relay invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayStatus {
	/// The ledger's dry run reported the claim invalid; nothing was submitted.
	Rejected,
	/// The claim transaction was accepted by the ledger.
	Submitted,
	/// Validation passed but the submission itself errored.
	SubmitFailed,
}

impl fmt::Display for RelayStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RelayStatus::Rejected => write!(f, "rejected"),
			RelayStatus::Submitted => write!(f, "submitted"),
			RelayStatus::SubmitFailed => write!(f, "submit_failed"),
		}
	}
}

/// Result of processing one claim request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayOutcome {
	status: RelayStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	reason: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	transaction_hash: Option<TransactionHash>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<String>,
}

impl RelayOutcome {
	/// The ledger's validation returned `reason`.
	pub fn rejected(reason: impl Into<String>) -> Self {
		Self {
			status: RelayStatus::Rejected,
			reason: Some(reason.into()),
			transaction_hash: None,
			error: None,
		}
	}

	/// The claim transaction was accepted under `hash`.
	pub fn submitted(hash: TransactionHash) -> Self {
		Self {
			status: RelayStatus::Submitted,
			reason: None,
			transaction_hash: Some(hash),
			error: None,
		}
	}

	/// Submission errored after a successful validation.
	pub fn submit_failed(error: impl Into<String>) -> Self {
		Self {
			status: RelayStatus::SubmitFailed,
			reason: Some(SUBMISSION_FAILED_REASON.to_string()),
			transaction_hash: None,
			error: Some(error.into()),
		}
	}

	pub fn status(&self) -> RelayStatus {
		self.status
	}

	pub fn reason(&self) -> Option<&str> {
		self.reason.as_deref()
	}

	pub fn transaction_hash(&self) -> Option<&TransactionHash> {
		self.transaction_hash.as_ref()
	}

	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}
}
