//! HTTP server for the relay API.
//!
//! Routes:
//! - `POST /api/claims`: relay a claim event, answered with the envelope body
//!   under the envelope's status code
//! - `GET /api/items/{item_id}/claims?finder=0x…`: recorded claims for an item
//! - `GET /health`: relay identity and resolved contract

use crate::handler;
use axum::{
	body::Bytes,
	extract::{DefaultBodyLimit, Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use relay_config::ApiConfig;
use relay_core::RelayEngine;
use relay_types::{parse_address, parse_item_id, APIError, ClaimEventsResponse, RelayResponse};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<RelayEngine>,
}

/// Query parameters of the claim events endpoint.
#[derive(Debug, Deserialize)]
pub struct ClaimsQuery {
	pub finder: Option<String>,
}

/// Builds the API router.
pub fn router(engine: Arc<RelayEngine>, max_request_size: usize) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/claims", post(handle_claim))
				.route("/items/{item_id}/claims", get(handle_get_claims)),
		)
		.route("/health", get(handle_health))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(max_request_size)),
		)
		.with_state(AppState { engine })
}

/// Starts the HTTP server and runs until it fails or is shut down.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<RelayEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, api_config.max_request_size);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Relay API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			let _ = tokio::signal::ctrl_c().await;
		})
		.await?;

	Ok(())
}

fn envelope_response(response: RelayResponse) -> Response {
	let status =
		StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
	(status, Json(response.body)).into_response()
}

/// Handles POST /api/claims requests.
async fn handle_claim(State(state): State<AppState>, body: Bytes) -> Response {
	match handler::handle_raw_event(&state.engine, &body).await {
		Ok(response) => envelope_response(response),
		Err(e) => {
			tracing::error!(error = %e, "Claim relay aborted");
			envelope_response(handler::unavailable_response(&e))
		},
	}
}

/// Handles GET /api/items/{item_id}/claims requests.
async fn handle_get_claims(
	Path(item_id): Path<String>,
	Query(query): Query<ClaimsQuery>,
	State(state): State<AppState>,
) -> Result<Json<ClaimEventsResponse>, APIError> {
	let item_id = parse_item_id(&item_id)?;
	let finder = query
		.finder
		.as_deref()
		.map(|f| parse_address("finder", f))
		.transpose()?;

	match state.engine.claim_events(&item_id, finder).await {
		Ok(claims) => Ok(Json(ClaimEventsResponse { claims })),
		Err(e) if e.is_unavailable() => {
			tracing::warn!("Claim events query failed: {}", e);
			Err(APIError::ServiceUnavailable {
				error_type: "LEDGER_UNAVAILABLE".to_string(),
				message: e.to_string(),
			})
		},
		Err(e) => {
			tracing::warn!("Claim events query failed: {}", e);
			Err(APIError::InternalServerError {
				error_type: "LEDGER_ERROR".to_string(),
				message: e.to_string(),
			})
		},
	}
}

/// Handles GET /health requests.
async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
	let engine = &state.engine;
	Json(serde_json::json!({
		"status": "ok",
		"relayId": engine.config().relay.id,
		"relayAddress": engine.relay_address(),
		"contract": engine.contract().address,
		"chainId": engine.contract().chain_id,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::handler::tests::{memory_engine, signed_event, CLAIMER_KEY, FINDER};
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use tower::ServiceExt;

	async fn app() -> Router {
		router(Arc::new(memory_engine().await), 64 * 1024)
	}

	async fn json_body(response: Response) -> serde_json::Value {
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		serde_json::from_slice(&bytes).unwrap()
	}

	fn post_claim(event: &serde_json::Value) -> Request<Body> {
		Request::builder()
			.method("POST")
			.uri("/api/claims")
			.header("content-type", "application/json")
			.body(Body::from(event.to_string()))
			.unwrap()
	}

	#[tokio::test]
	async fn test_claim_round_trip_over_http() {
		let app = app().await;

		let response = app
			.clone()
			.oneshot(post_claim(&signed_event(CLAIMER_KEY, "desc")))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let body = json_body(response).await;
		assert_eq!(body["success"], true);
		let tx_hash = body["txHash"].as_str().unwrap().to_string();

		let response = app
			.oneshot(
				Request::builder()
					.uri(format!("/api/items/0x1/claims?finder={FINDER}"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let body = json_body(response).await;
		let claims = body["claims"].as_array().unwrap();
		assert_eq!(claims.len(), 1);
		assert_eq!(claims[0]["transactionHash"], tx_hash);
	}

	#[tokio::test]
	async fn test_rejected_claim_status() {
		let mut event = signed_event(CLAIMER_KEY, "desc");
		event["descriptionLink"] = serde_json::json!("tampered");

		let response = app().await.oneshot(post_claim(&event)).await.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		let body = json_body(response).await;
		assert_eq!(body["success"], false);
		assert_eq!(body["reason"], "Invalid signature");
	}

	#[tokio::test]
	async fn test_bad_item_id_is_bad_request() {
		let too_long = format!("0x{}", "ab".repeat(33));
		let response = app()
			.await
			.oneshot(
				Request::builder()
					.uri(format!("/api/items/{too_long}/claims"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		let body = json_body(response).await;
		assert_eq!(body["error"], "INVALID_PARAMETER");
	}

	#[tokio::test]
	async fn test_health() {
		let response = app()
			.await
			.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let body = json_body(response).await;
		assert_eq!(body["status"], "ok");
		assert_eq!(body["relayId"], "service-test");
		assert_eq!(body["chainId"], 31337);
	}
}
