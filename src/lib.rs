//! OAuth 2.0 client-credentials token manager for API SDKs: cached bearer tokens,
//! leeway-aware expiry, and single-flight renewal behind a pluggable transport.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod ext;
pub mod http;
pub mod manager;
pub mod oauth;
pub mod obs;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::{_prelude::*, clock::ManualClock};

	// self
	use crate::{
		auth::ClientCredentials,
		clock::Clock,
		config::TokenManagerConfig,
		http::ReqwestHttpClient,
		manager::{ReqwestTokenManager, TokenManager},
		oauth::ReqwestTransportErrorMapper,
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a config for a mock token endpoint, allowing plain `http`.
	pub fn test_config(token_endpoint: &str) -> TokenManagerConfig {
		TokenManagerConfig::builder()
			.token_endpoint(Url::parse(token_endpoint).expect("Mock token endpoint should parse."))
			.allow_insecure_http(true)
			.build()
			.expect("Mock token manager config should build.")
	}

	/// Constructs a reqwest-backed [`TokenManager`] driven by `clock`.
	pub fn build_reqwest_test_manager(
		config: TokenManagerConfig,
		client_id: &str,
		client_secret: &str,
		clock: Arc<dyn Clock>,
	) -> ReqwestTokenManager {
		let credentials = ClientCredentials::new(client_id, client_secret)
			.expect("Test client credentials should be valid.");

		TokenManager::with_clock(
			config,
			credentials,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
			clock,
		)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;

pub use auth::{ClientCredentials, ClientId, Secret, TokenRecord, TokenStatus, TokenType};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientAuthMethod, TokenManagerConfig, TokenManagerConfigBuilder};
pub use error::{AuthErrorKind, Error, Result};
pub use ext::{BearerSigner, RequestSignerExt};
pub use manager::{ExchangeMetrics, TokenManager};
#[cfg(feature = "reqwest")] pub use manager::ReqwestTokenManager;

#[cfg(test)] use {base64 as _, color_eyre as _, httpmock as _};
