//! Wire types for the relay entry points.
//!
//! The relay is driven by an event of the shape
//! `{ goodID, finder, descriptionLink, sig: { v, r, s } }` and answers with an
//! envelope `{ statusCode, body: { success, reason?, txHash?, error? } }`. The
//! same envelope is returned by the HTTP server and by the one-shot invoke
//! mode.

use crate::{
	parse_address, parse_b256, parse_item_id, ClaimEvent, ClaimRequest, ClaimSignature,
	EncodingError, RelayOutcome, RelayStatus,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signature recovery id as found on the wire.
///
/// Signing libraries emit `v` either as a number or as a hex string such as
/// `"0x1c"`; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecoveryIdPayload {
	Number(u64),
	Text(String),
}

impl RecoveryIdPayload {
	fn to_u64(&self) -> Result<u64, EncodingError> {
		match self {
			RecoveryIdPayload::Number(v) => Ok(*v),
			RecoveryIdPayload::Text(s) => {
				let trimmed = s.trim();
				let parsed = match trimmed
					.strip_prefix("0x")
					.or_else(|| trimmed.strip_prefix("0X"))
				{
					Some(digits) => u64::from_str_radix(digits, 16),
					None => trimmed.parse::<u64>(),
				};
				parsed.map_err(|e| EncodingError::InvalidHex {
					field: "sig.v".to_string(),
					message: e.to_string(),
				})
			},
		}
	}
}

/// Detached signature as found on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePayload {
	pub v: RecoveryIdPayload,
	pub r: String,
	pub s: String,
}

/// Incoming claim event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEventPayload {
	#[serde(rename = "goodID")]
	pub good_id: String,
	pub finder: String,
	#[serde(rename = "descriptionLink")]
	pub description_link: String,
	pub sig: SignaturePayload,
}

impl TryFrom<&SignaturePayload> for ClaimSignature {
	type Error = EncodingError;

	fn try_from(payload: &SignaturePayload) -> Result<Self, Self::Error> {
		ClaimSignature::new(
			payload.v.to_u64()?,
			parse_b256("sig.r", &payload.r)?,
			parse_b256("sig.s", &payload.s)?,
		)
	}
}

impl TryFrom<&ClaimEventPayload> for ClaimRequest {
	type Error = EncodingError;

	fn try_from(payload: &ClaimEventPayload) -> Result<Self, Self::Error> {
		Ok(ClaimRequest::new(
			parse_item_id(&payload.good_id)?,
			parse_address("finder", &payload.finder)?,
			payload.description_link.clone(),
			ClaimSignature::try_from(&payload.sig)?,
		))
	}
}

/// Body of a relay response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponseBody {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	#[serde(rename = "txHash", skip_serializing_if = "Option::is_none")]
	pub tx_hash: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Response envelope returned to the event dispatcher.
///
/// `statusCode` says whether the request itself was acceptable, `success`
/// says whether a claim transaction was submitted:
///
/// | outcome            | statusCode | success |
/// |--------------------|-----------:|---------|
/// | submitted          | 200        | true    |
/// | rejected/malformed | 400        | false   |
/// | submission failed  | 502        | false   |
/// | ledger unavailable | 503        | false   |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
	#[serde(rename = "statusCode")]
	pub status_code: u16,
	pub body: RelayResponseBody,
}

impl RelayResponse {
	fn failure(status_code: u16, reason: String, error: Option<String>) -> Self {
		Self {
			status_code,
			body: RelayResponseBody {
				success: false,
				reason: Some(reason),
				tx_hash: None,
				error,
			},
		}
	}

	/// The event was not valid JSON of the expected shape.
	pub fn invalid_event(message: impl Into<String>) -> Self {
		Self::failure(400, message.into(), None)
	}

	/// The event could not be decoded into a claim.
	pub fn malformed(error: &EncodingError) -> Self {
		Self::invalid_event(error.to_string())
	}

	/// The ledger could not be reached.
	pub fn unavailable(message: impl Into<String>) -> Self {
		Self::failure(503, message.into(), None)
	}
}

impl From<&RelayOutcome> for RelayResponse {
	fn from(outcome: &RelayOutcome) -> Self {
		match outcome.status() {
			RelayStatus::Submitted => Self {
				status_code: 200,
				body: RelayResponseBody {
					success: true,
					reason: None,
					tx_hash: outcome.transaction_hash().map(|h| h.to_string()),
					error: None,
				},
			},
			RelayStatus::Rejected => Self::failure(
				400,
				outcome.reason().unwrap_or_default().to_string(),
				None,
			),
			RelayStatus::SubmitFailed => Self::failure(
				502,
				outcome.reason().unwrap_or_default().to_string(),
				outcome.error().map(str::to_string),
			),
		}
	}
}

/// Response of the claim events query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimEventsResponse {
	pub claims: Vec<ClaimEvent>,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
}

/// Errors of the query endpoints, mapped to HTTP status codes.
#[derive(Debug)]
pub enum APIError {
	/// Malformed path or query parameter (400).
	BadRequest { error_type: String, message: String },
	/// Ledger could not be reached (503).
	ServiceUnavailable { error_type: String, message: String },
	/// Anything else (500).
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			APIError::BadRequest { error_type, message }
			| APIError::ServiceUnavailable { error_type, message }
			| APIError::InternalServerError { error_type, message } => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl From<EncodingError> for APIError {
	fn from(err: EncodingError) -> Self {
		APIError::BadRequest {
			error_type: "INVALID_PARAMETER".to_string(),
			message: err.to_string(),
		}
	}
}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
