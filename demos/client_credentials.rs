//! Demonstrates the token manager against a mock token endpoint: the first call performs the
//! client-credentials exchange, later calls reuse the cached bearer token to sign API requests.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_token_manager::{
	ClientCredentials, TokenManager, TokenManagerConfig, http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper, reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/onboarding").header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body("{\"steps\":[]}");
		})
		.await;
	let config = TokenManagerConfig::builder()
		.base_url(Url::parse(&server.base_url())?)
		.allow_insecure_http(true)
		.build()?;
	let http_client = ReqwestHttpClient::with_client(Client::builder().build()?);
	let api_client = http_client.client().clone();
	let manager = <TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>>::with_http_client(
		config,
		ClientCredentials::new("demo-client", "super-secret")?,
		http_client,
		ReqwestTransportErrorMapper,
	);

	for _ in 0..3 {
		let response = manager
			.authorize(api_client.get(server.url("/api/v2/onboarding")))
			.await?
			.send()
			.await?;

		println!("Onboarding API answered {}.", response.status());
	}

	println!("Cached token: {:?}.", manager.cached());

	token_mock.assert_calls_async(1).await;
	api_mock.assert_calls_async(3).await;

	Ok(())
}
