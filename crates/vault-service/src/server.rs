//! HTTP server for the vault API.
//!
//! Routes are nested under `/api`. Errors are returned as `{ error, message }`
//! bodies where `error` is a stable machine code.

use axum::{
	extract::{Path, State},
	response::Json,
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use vault_config::ApiConfig;
use vault_core::VaultService;
use vault_types::{
	APIError, AuthorizationStatusResponse, DepositRequest, DepositResponse, SignerStatusResponse,
	VaultStatusResponse, WithdrawReceipt, WithdrawRequest,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub service: Arc<VaultService>,
}

/// Builds the API router.
pub fn router(service: Arc<VaultService>) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/vault", get(handle_status))
				.route("/signers/{address}", get(handle_get_signer))
				.route("/authorizations/{nonce}", get(handle_get_authorization))
				.route("/withdrawals", post(handle_withdraw))
				.route("/deposits", post(handle_deposit)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(AppState { service })
}

/// Starts the HTTP server and runs until ctrl-c.
pub async fn start_server(
	api_config: ApiConfig,
	service: Arc<VaultService>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(service);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Vault API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!("Failed to listen for shutdown signal: {}", e);
			}
		})
		.await?;

	Ok(())
}

/// Handles GET /api/vault requests.
async fn handle_status(State(state): State<AppState>) -> Json<VaultStatusResponse> {
	Json(crate::apis::vault::get_status(&state.service).await)
}

/// Handles GET /api/signers/{address} requests.
async fn handle_get_signer(
	Path(address): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<SignerStatusResponse>, APIError> {
	crate::apis::signers::get_signer(&address, &state.service).map(Json)
}

/// Handles GET /api/authorizations/{nonce} requests.
async fn handle_get_authorization(
	Path(nonce): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<AuthorizationStatusResponse>, APIError> {
	crate::apis::vault::get_authorization(&nonce, &state.service)
		.await
		.map(Json)
}

/// Handles POST /api/withdrawals requests.
async fn handle_withdraw(
	State(state): State<AppState>,
	Json(request): Json<WithdrawRequest>,
) -> Result<Json<WithdrawReceipt>, APIError> {
	crate::apis::withdraw::process_withdrawal(request, &state.service)
		.await
		.map(Json)
}

/// Handles POST /api/deposits requests.
async fn handle_deposit(
	State(state): State<AppState>,
	Json(request): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, APIError> {
	match crate::apis::vault::process_deposit(request, &state.service).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Deposit failed: {}", e);
			Err(e)
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		body::{to_bytes, Body},
		http::{Request, StatusCode},
	};
	use serde_json::Value;
	use tower::ServiceExt;
	use vault_config::Config;
	use vault_core::VaultBuilder;
	use vault_signer::{create_signer, AuthorizationSigner};
	use vault_types::{Address, Bytes, U256};

	const CONFIG: &str = r#"
[vault]
chain_id = 31337
deployer = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
initial_deposit = "10000000000000000000"

[[genesis]]
address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
balance = "100000000000000000000"

[signer]
primary = "local"
[signer.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	const RECEIVER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

	async fn setup() -> (Arc<VaultService>, AuthorizationSigner) {
		let config: Config = CONFIG.parse().unwrap();
		let signer = AuthorizationSigner::new(
			create_signer(&config.signer.primary, config.primary_signer().unwrap()).unwrap(),
		);
		let service = VaultBuilder::new(config)
			.with_default_signer(signer.address().await.unwrap())
			.build()
			.unwrap();
		(Arc::new(service), signer)
	}

	async fn signed_request(
		service: &VaultService,
		signer: &AuthorizationSigner,
		amount: u64,
		nonce: u64,
	) -> WithdrawRequest {
		signer
			.sign_withdrawal(
				service.vault_address(),
				RECEIVER.parse().unwrap(),
				U256::from(amount),
				U256::from(nonce),
				service.chain_id(),
			)
			.await
			.unwrap()
	}

	async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
		let response = app.oneshot(request).await.unwrap();
		let status = response.status();
		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&body).unwrap())
	}

	fn post_json(uri: &str, body: String) -> Request<Body> {
		Request::post(uri)
			.header("content-type", "application/json")
			.body(Body::from(body))
			.unwrap()
	}

	fn get_req(uri: &str) -> Request<Body> {
		Request::get(uri).body(Body::empty()).unwrap()
	}

	#[tokio::test]
	async fn test_vault_status() {
		let (service, _) = setup().await;
		let (status, body) = send(router(service.clone()), get_req("/api/vault")).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["balance"], "10000000000000000000");
		assert_eq!(body["chainId"], 31337);
		assert_eq!(body["consumedAuthorizations"], 0);
	}

	#[tokio::test]
	async fn test_withdraw_then_replay() {
		let (service, signer) = setup().await;
		let request = signed_request(&service, &signer, 1_000, 12345).await;
		let body = serde_json::to_string(&request).unwrap();

		let (status, receipt) =
			send(router(service.clone()), post_json("/api/withdrawals", body.clone())).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(receipt["amount"], "1000");
		assert_eq!(receipt["nonce"], "12345");

		let (status, error) = send(router(service.clone()), post_json("/api/withdrawals", body)).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(error["error"], "AUTHORIZATION_CONSUMED");
		assert_eq!(error["message"], "Authorization already consumed");

		let (status, lookup) =
			send(router(service.clone()), get_req("/api/authorizations/12345")).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(lookup["consumed"], true);
	}

	#[tokio::test]
	async fn test_withdraw_error_statuses() {
		let (service, signer) = setup().await;

		let mut tampered = signed_request(&service, &signer, 1_000, 1).await;
		tampered.amount = U256::from(2_000u64);
		let (status, body) = send(
			router(service.clone()),
			post_json("/api/withdrawals", serde_json::to_string(&tampered).unwrap()),
		)
		.await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(body["error"], "INVALID_SIGNATURE");

		let mut truncated = signed_request(&service, &signer, 1_000, 2).await;
		truncated.signature = Bytes::copy_from_slice(&truncated.signature[..64]);
		let (status, body) = send(
			router(service.clone()),
			post_json("/api/withdrawals", serde_json::to_string(&truncated).unwrap()),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "MALFORMED_SIGNATURE");

		let too_much = signer
			.sign_withdrawal(
				service.vault_address(),
				RECEIVER.parse().unwrap(),
				U256::from(10u64).pow(U256::from(20u64)),
				U256::from(3u64),
				service.chain_id(),
			)
			.await
			.unwrap();
		let (status, body) = send(
			router(service.clone()),
			post_json("/api/withdrawals", serde_json::to_string(&too_much).unwrap()),
		)
		.await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "INSUFFICIENT_FUNDS");
		assert!(!service.is_consumed(&U256::from(3u64)).await);
	}

	#[tokio::test]
	async fn test_signer_lookup() {
		let (service, signer) = setup().await;
		let address = signer.address().await.unwrap();

		let (status, body) = send(
			router(service.clone()),
			get_req(&format!("/api/signers/{}", address)),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["trusted"], true);

		let (_, body) = send(
			router(service.clone()),
			get_req(&format!("/api/signers/{}", Address::repeat_byte(0x11))),
		)
		.await;
		assert_eq!(body["trusted"], false);

		let (status, body) = send(router(service), get_req("/api/signers/not-an-address")).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_ADDRESS");
	}

	#[tokio::test]
	async fn test_deposit() {
		let (service, signer) = setup().await;
		let request = signer
			.sign_deposit(service.vault_address(), U256::from(5u64), U256::ZERO, service.chain_id())
			.await
			.unwrap();
		let body = serde_json::to_string(&request).unwrap();

		let (status, response) =
			send(router(service.clone()), post_json("/api/deposits", body.clone())).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(response["vaultBalance"], "10000000000000000005");

		let (status, response) = send(router(service), post_json("/api/deposits", body)).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(response["error"], "AUTHORIZATION_CONSUMED");
	}

	#[tokio::test]
	async fn test_deposit_from_foreign_account_is_rejected() {
		let (service, signer) = setup().await;
		let victim: Address = RECEIVER.parse().unwrap();
		service
			.fund(victim, U256::from(10u64).pow(U256::from(18u64)))
			.await
			.unwrap();

		// Signed by the configured signer but debiting someone else's account.
		let mut request = signer
			.sign_deposit(service.vault_address(), U256::from(1_000u64), U256::ZERO, service.chain_id())
			.await
			.unwrap();
		request.from = victim;
		let (status, response) = send(
			router(service.clone()),
			post_json("/api/deposits", serde_json::to_string(&request).unwrap()),
		)
		.await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(response["error"], "INVALID_SIGNATURE");

		let unsigned = serde_json::json!({
			"from": victim,
			"amount": "1000",
		});
		let (status, _) =
			send(router(service.clone()), post_json("/api/deposits", unsigned.to_string())).await;
		assert!(status.is_client_error());

		assert_eq!(
			service.balance_of(&victim).await,
			U256::from(10u64).pow(U256::from(18u64))
		);
		assert_eq!(service.balance().await, U256::from(10u64).pow(U256::from(19u64)));
	}

	#[tokio::test]
	async fn test_deposit_without_funds() {
		let (service, _) = setup().await;
		let poor = AuthorizationSigner::new(
			create_signer(
				"local",
				&toml::from_str(
					"private_key = \"0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a\"",
				)
				.unwrap(),
			)
			.unwrap(),
		);
		let request = poor
			.sign_deposit(service.vault_address(), U256::from(1u64), U256::ZERO, service.chain_id())
			.await
			.unwrap();

		let (status, response) = send(
			router(service),
			post_json("/api/deposits", serde_json::to_string(&request).unwrap()),
		)
		.await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(response["error"], "INSUFFICIENT_BALANCE");
	}
}
