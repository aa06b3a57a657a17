//! Validated token manager configuration and its builder.

// self
use crate::{_prelude::*, error::ConfigError};

/// Token endpoint path relative to the API base URL.
pub const DEFAULT_TOKEN_PATH: &str = "api/v1/token";

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Immutable configuration consumed by the token manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenManagerConfig {
	/// Absolute URL of the token endpoint.
	pub token_endpoint: Url,
	/// Safety margin kept in reserve before a cached token's expiry.
	pub leeway: Duration,
	/// Client authentication mode for the token request.
	pub client_auth_method: ClientAuthMethod,
	/// Request timeout applied by the default reqwest transport.
	pub http_timeout: Option<Duration>,
}
impl TokenManagerConfig {
	/// Leeway applied when none is configured.
	pub const DEFAULT_LEEWAY: Duration = Duration::seconds(5);

	/// Creates a new builder.
	pub fn builder() -> TokenManagerConfigBuilder {
		TokenManagerConfigBuilder::default()
	}
}

/// Builder for [`TokenManagerConfig`] values.
#[derive(Clone, Debug)]
pub struct TokenManagerConfigBuilder {
	/// Explicit token endpoint; wins over `base_url`.
	pub token_endpoint: Option<Url>,
	/// API base URL that [`DEFAULT_TOKEN_PATH`] is joined onto.
	pub base_url: Option<Url>,
	/// Expiry leeway.
	pub leeway: Duration,
	/// Client authentication mode.
	pub client_auth_method: ClientAuthMethod,
	/// Optional transport timeout.
	pub http_timeout: Option<Duration>,
	/// Permits plain `http` token endpoints (local development and tests).
	pub allow_insecure_http: bool,
}
impl Default for TokenManagerConfigBuilder {
	fn default() -> Self {
		Self {
			token_endpoint: None,
			base_url: None,
			leeway: TokenManagerConfig::DEFAULT_LEEWAY,
			client_auth_method: ClientAuthMethod::default(),
			http_timeout: None,
			allow_insecure_http: false,
		}
	}
}
impl TokenManagerConfigBuilder {
	/// Sets the absolute token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the API base URL; the token endpoint becomes `<base>/api/v1/token`.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Overrides the expiry leeway (defaults to 5 seconds).
	pub fn leeway(mut self, leeway: Duration) -> Self {
		self.leeway = leeway;

		self
	}

	/// Overrides the client authentication mode.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Sets the transport timeout used by the default reqwest client.
	pub fn http_timeout(mut self, timeout: Duration) -> Self {
		self.http_timeout = Some(timeout);

		self
	}

	/// Allows or forbids plain `http` token endpoints.
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.allow_insecure_http = allow;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<TokenManagerConfig, ConfigError> {
		let token_endpoint = match (self.token_endpoint, self.base_url) {
			(Some(endpoint), _) => endpoint,
			(None, Some(base)) => join_token_path(&base)?,
			(None, None) => return Err(ConfigError::MissingTokenEndpoint),
		};

		validate_endpoint(&token_endpoint, self.allow_insecure_http)?;

		if self.leeway.is_negative() {
			return Err(ConfigError::NegativeLeeway);
		}
		if self.http_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(ConfigError::NonPositiveTimeout);
		}

		Ok(TokenManagerConfig {
			token_endpoint,
			leeway: self.leeway,
			client_auth_method: self.client_auth_method,
			http_timeout: self.http_timeout,
		})
	}
}

fn join_token_path(base: &Url) -> Result<Url, ConfigError> {
	let mut base = base.clone();

	// Without a trailing slash `join` would replace the last path segment.
	if !base.path().ends_with('/') {
		let path = format!("{}/", base.path());

		base.set_path(&path);
	}

	base.join(DEFAULT_TOKEN_PATH).map_err(|source| ConfigError::InvalidTokenEndpoint { source })
}

fn validate_endpoint(url: &Url, allow_insecure_http: bool) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if allow_insecure_http => Ok(()),
		_ => Err(ConfigError::InsecureTokenEndpoint { url: url.to_string() }),
	}
}
