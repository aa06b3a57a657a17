// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use httpmock::prelude::*;
use time::macros;
// self
use oauth2_token_manager::{
	_preludet::*,
	auth::TokenRecord,
	clock::ManualClock,
	config::{ClientAuthMethod, TokenManagerConfig},
	error::{AuthErrorKind, MalformedError, UnavailableError},
	manager::ReqwestTokenManager,
};

const CLIENT_ID: &str = "sdk-client";
const CLIENT_SECRET: &str = "sdk-secret";
const TOKEN_PATH: &str = "/api/v1/token";

fn clock() -> ManualClock {
	ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC))
}

fn token_body(token: &str, expires_in: u64) -> String {
	format!("{{\"access_token\":\"{token}\",\"token_type\":\"Bearer\",\"expires_in\":{expires_in}}}")
}

fn basic(client_id: &str, client_secret: &str) -> String {
	format!("Basic {}", STANDARD.encode(format!("{client_id}:{client_secret}")))
}

fn manager(server: &MockServer, clock: &ManualClock) -> ReqwestTokenManager {
	manager_with(test_config(&server.url(TOKEN_PATH)), CLIENT_SECRET, clock)
}

fn manager_with(
	config: TokenManagerConfig,
	client_secret: &str,
	clock: &ManualClock,
) -> ReqwestTokenManager {
	build_reqwest_test_manager(config, CLIENT_ID, client_secret, Arc::new(clock.clone()))
}

#[tokio::test]
async fn repeated_calls_reuse_cached_token() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("cached-token", 3600));
		})
		.await;

	for _ in 0..5 {
		let record = manager.get_token().await.expect("Token request should succeed.");

		assert_eq!(record.access_token.expose(), "cached-token");
	}

	mock.assert_calls_async(1).await;

	assert_eq!(manager.metrics().exchanges(), 1);
	assert_eq!(manager.metrics().cache_hits(), 4);

	let cached = manager.cached().expect("Successful exchange should populate the cache.");

	assert_eq!(cached.issued_at, macros::datetime!(2025-01-01 00:00 UTC));
	assert_eq!(cached.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
}

#[tokio::test]
async fn expiry_boundary_without_leeway() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let config = TokenManagerConfig::builder()
		.token_endpoint(
			Url::parse(&server.url(TOKEN_PATH)).expect("Mock token endpoint should parse."),
		)
		.allow_insecure_http(true)
		.leeway(Duration::ZERO)
		.build()
		.expect("Zero leeway config should build.");
	let manager = manager_with(config, CLIENT_SECRET, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("short-lived", 100));
		})
		.await;

	manager.get_token().await.expect("Initial exchange should succeed.");
	clock.advance(Duration::seconds(99));
	manager.get_token().await.expect("Token should still be cached at T+99.");

	mock.assert_calls_async(1).await;

	clock.advance(Duration::seconds(2));

	let renewed = manager.get_token().await.expect("Expired token should be renewed at T+101.");

	mock.assert_calls_async(2).await;

	assert_eq!(renewed.issued_at, macros::datetime!(2025-01-01 00:01:41 UTC));
}

#[tokio::test]
async fn default_leeway_renews_before_expiry() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("leeway-token", 100));
		})
		.await;

	manager.get_token().await.expect("Initial exchange should succeed.");
	clock.advance(Duration::seconds(94));
	manager.get_token().await.expect("Token should be served from cache at T+94.");

	mock.assert_calls_async(1).await;

	clock.advance(Duration::seconds(1));
	manager.get_token().await.expect("Token inside the leeway window should be renewed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn concurrent_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body(token_body("shared-token", 900));
		})
		.await;
	let handles = (0..10)
		.map(|_| {
			let manager = manager.clone();

			tokio::spawn(async move { manager.get_token().await })
		})
		.collect::<Vec<_>>();
	let mut records = Vec::new();

	for handle in handles {
		records.push(
			handle
				.await
				.expect("Token task should not panic.")
				.expect("Every concurrent caller should receive a token."),
		);
	}

	assert!(records.iter().all(|record| record == &records[0]));
	assert_eq!(records[0].access_token.expose(), "shared-token");
	assert_eq!(manager.metrics().exchanges(), 1);
	assert!(!manager.is_exchange_in_flight());

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn client_secret_basic_request_shape() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("authorization", basic(CLIENT_ID, CLIENT_SECRET))
				.header("content-type", "application/x-www-form-urlencoded")
				.body("grant_type=client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("basic-token", 600));
		})
		.await;
	let header =
		manager.authorization_header().await.expect("Basic-authenticated exchange should succeed.");

	assert_eq!(header, "Bearer basic-token");

	mock.assert_async().await;
}

#[tokio::test]
async fn client_secret_post_request_shape() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let config = TokenManagerConfig::builder()
		.token_endpoint(
			Url::parse(&server.url(TOKEN_PATH)).expect("Mock token endpoint should parse."),
		)
		.allow_insecure_http(true)
		.client_auth_method(ClientAuthMethod::ClientSecretPost)
		.build()
		.expect("Client secret post config should build.");
	let manager = manager_with(config, CLIENT_SECRET, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.body("grant_type=client_credentials&client_id=sdk-client&client_secret=sdk-secret");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("post-token", 600));
		})
		.await;
	let record = manager.get_token().await.expect("Form-authenticated exchange should succeed.");

	assert_eq!(record.access_token.expose(), "post-token");

	mock.assert_async().await;
}

#[tokio::test]
async fn rejected_credentials_surface_and_corrected_ones_succeed() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let rejected = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).header("authorization", basic(CLIENT_ID, "wrong"));
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\",\"error_description\":\"bad secret\"}");
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("authorization", basic(CLIENT_ID, CLIENT_SECRET));
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("recovered-token", 600));
		})
		.await;
	let broken = manager_with(test_config(&server.url(TOKEN_PATH)), "wrong", &clock);
	let err = broken.get_token().await.expect_err("Wrong client secret must be rejected.");

	assert_eq!(err.kind(), AuthErrorKind::InvalidCredentials);
	assert_eq!(err.status(), Some(401));
	assert!(!err.is_retryable());
	assert!(err.to_string().contains("bad secret"));
	assert!(broken.cached().is_none());
	assert_eq!(broken.metrics().failures(), 1);

	rejected.assert_async().await;

	let fixed = manager(&server, &clock);
	let record = fixed.get_token().await.expect("Corrected credentials should succeed.");

	assert_eq!(record.access_token.expose(), "recovered-token");

	accepted.assert_async().await;
}

#[tokio::test]
async fn empty_unauthorized_body_is_still_invalid_credentials() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401);
		})
		.await;
	let err = manager.get_token().await.expect_err("401 responses must fail.");

	assert!(matches!(err, Error::InvalidCredentials { status: Some(401), .. }));
}

#[tokio::test]
async fn missing_expires_in_is_malformed_and_not_cached() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"no-expiry\",\"token_type\":\"Bearer\"}");
		})
		.await;
	let err = manager.get_token().await.expect_err("Missing expires_in must be rejected.");

	assert!(matches!(err, Error::Malformed(MalformedError::MissingExpiresIn)));
	assert_eq!(err.kind(), AuthErrorKind::MalformedResponse);
	assert!(manager.cached().is_none());

	manager.get_token().await.expect_err("Failures must not be cached.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn unparseable_success_body_is_malformed() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body("{\"token\":");
		})
		.await;
	let err = manager.get_token().await.expect_err("Broken JSON must be rejected.");

	assert!(matches!(err, Error::Malformed(MalformedError::Json { status: Some(200), .. })));
}

#[tokio::test]
async fn server_errors_are_unavailable_with_retry_hint() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500)
				.header("content-type", "application/json")
				.header("retry-after", "7")
				.body("{\"error\":\"server_error\"}");
		})
		.await;
	let err = manager.get_token().await.expect_err("Server errors must fail the call.");

	assert_eq!(err.kind(), AuthErrorKind::TokenEndpointUnavailable);
	assert_eq!(err.status(), Some(500));
	assert_eq!(err.retry_after(), Some(Duration::seconds(7)));
	assert!(err.is_retryable());
	assert!(matches!(err, Error::Unavailable(UnavailableError::TokenEndpoint { .. })));

	mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_endpoint_is_unavailable() {
	let clock = clock();
	let manager = manager_with(test_config("http://127.0.0.1:1/api/v1/token"), CLIENT_SECRET, &clock);
	let err = manager.get_token().await.expect_err("Connection failures must fail the call.");

	assert_eq!(err.kind(), AuthErrorKind::TokenEndpointUnavailable);
	assert_eq!(err.status(), None);
}

#[tokio::test]
async fn invalidate_forces_a_new_exchange() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("rotating-token", 3600));
		})
		.await;

	manager.get_token().await.expect("Initial exchange should succeed.");

	let dropped: Option<TokenRecord> = manager.invalidate();

	assert!(dropped.is_some());
	assert!(manager.cached().is_none());

	manager.get_token().await.expect("Exchange after invalidation should succeed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn authorized_requests_carry_the_bearer_token() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("api-token", 3600));
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v2/onboarding")
				.header("authorization", "Bearer api-token");
			then.status(200).header("content-type", "application/json").body("{\"steps\":[]}");
		})
		.await;
	let http_client = test_reqwest_http_client();

	for _ in 0..2 {
		let request = manager
			.authorize(http_client.client().get(server.url("/api/v2/onboarding")))
			.await
			.expect("Signing the protected request should succeed.");
		let response = request.send().await.expect("Protected request should be delivered.");

		assert_eq!(response.status().as_u16(), 200);
	}

	token_mock.assert_calls_async(1).await;
	api_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn oversized_leeway_renews_instead_of_panicking() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let config = TokenManagerConfig::builder()
		.token_endpoint(
			Url::parse(&server.url(TOKEN_PATH)).expect("Mock token endpoint should parse."),
		)
		.allow_insecure_http(true)
		.leeway(Duration::days(365 * 10_000))
		.build()
		.expect("Large leeway config should build.");
	let manager = manager_with(config, CLIENT_SECRET, &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("never-cached", 3600));
		})
		.await;

	manager.get_token().await.expect("First exchange should succeed.");
	manager.get_token().await.expect("Second call should renew rather than hit the cache.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn failed_renewal_keeps_previous_record() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let manager = manager(&server, &clock);
	let mut first_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("original-token", 100));
		})
		.await;
	let original = manager.get_token().await.expect("Initial exchange should succeed.");

	first_mock.assert_calls_async(1).await;
	first_mock.delete_async().await;
	clock.advance(Duration::seconds(200));

	let mut outage_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500)
				.header("content-type", "application/json")
				.body("{\"error\":\"server_error\"}");
		})
		.await;
	let err = manager.get_token().await.expect_err("Renewal during an outage must fail.");

	assert_eq!(err.kind(), AuthErrorKind::TokenEndpointUnavailable);
	assert_eq!(manager.cached(), Some(original));

	outage_mock.assert_calls_async(1).await;
	outage_mock.delete_async().await;

	let recovered_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("recovered-token", 100));
		})
		.await;
	let recovered = manager.get_token().await.expect("Renewal after recovery should succeed.");

	assert_eq!(recovered.access_token.expose(), "recovered-token");
	assert_eq!(manager.cached(), Some(recovered));

	recovered_mock.assert_calls_async(1).await;
}
