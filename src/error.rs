//! Token manager error taxonomy shared by the exchange facade, transports, and callers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Coarse failure classes surfaced by [`Error::kind`].
///
/// Callers use the kind to tell configuration mistakes (bad credentials, bad endpoint) apart
/// from outages they may retry with backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
	/// Token endpoint rejected the client credentials.
	InvalidCredentials,
	/// Token endpoint could not be reached or answered with a non-success status.
	TokenEndpointUnavailable,
	/// Token endpoint answered 200 but the body broke the token contract.
	MalformedResponse,
	/// Local configuration problem detected before or while building the request.
	Configuration,
}
impl AuthErrorKind {
	/// Returns a stable label suitable for logs and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthErrorKind::InvalidCredentials => "invalid_credentials",
			AuthErrorKind::TokenEndpointUnavailable => "token_endpoint_unavailable",
			AuthErrorKind::MalformedResponse => "malformed_response",
			AuthErrorKind::Configuration => "configuration",
		}
	}
}
impl Display for AuthErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical error exposed by public APIs.
///
/// The type is `Clone` so a single failed exchange can be handed to every caller that was
/// waiting on it.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token endpoint could not serve a token right now; retry with backoff.
	#[error(transparent)]
	Unavailable(#[from] UnavailableError),
	/// Token endpoint answered with a body that violates the token contract.
	#[error(transparent)]
	Malformed(#[from] MalformedError),

	/// Client authentication failed.
	#[error("Token endpoint rejected the client credentials: {reason}.")]
	InvalidCredentials {
		/// Server- or manager-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl Error {
	/// Classifies the error into an [`AuthErrorKind`].
	pub fn kind(&self) -> AuthErrorKind {
		match self {
			Self::Config(_) => AuthErrorKind::Configuration,
			Self::Unavailable(_) => AuthErrorKind::TokenEndpointUnavailable,
			Self::Malformed(_) => AuthErrorKind::MalformedResponse,
			Self::InvalidCredentials { .. } => AuthErrorKind::InvalidCredentials,
		}
	}

	/// HTTP status returned by the token endpoint, if one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::InvalidCredentials { status, .. } => *status,
			Self::Unavailable(UnavailableError::TokenEndpoint { status, .. }) => *status,
			Self::Malformed(MalformedError::Json { status, .. })
			| Self::Malformed(MalformedError::UnexpectedResponse { status, .. }) => *status,
			_ => None,
		}
	}

	/// Upstream `Retry-After` hint, if the token endpoint supplied one.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Unavailable(UnavailableError::TokenEndpoint { retry_after, .. }) => *retry_after,
			_ => None,
		}
	}

	/// Returns `true` when the caller may retry the exchange later.
	pub fn is_retryable(&self) -> bool {
		matches!(self.kind(), AuthErrorKind::TokenEndpointUnavailable)
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("Token request could not be constructed.")]
	HttpRequest {
		/// Underlying request builder failure.
		#[source]
		source: Arc<oauth2::http::Error>,
	},
	/// Client credentials failed validation.
	#[error(transparent)]
	Credentials(#[from] crate::auth::CredentialsError),
	/// Token endpoint URL cannot be parsed or joined.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},

	/// Neither a token endpoint nor a base URL was configured.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Token endpoint does not use HTTPS and insecure HTTP was not allowed.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureTokenEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Expiry leeway must not be negative.
	#[error("Expiry leeway must not be negative.")]
	NegativeLeeway,
	/// HTTP timeout must be positive.
	#[error("HTTP timeout must be positive.")]
	NonPositiveTimeout,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest { source: Arc::new(e) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures that leave the token endpoint unusable for now; safe to retry.
#[derive(Clone, Debug, ThisError)]
pub enum UnavailableError {
	/// Token endpoint answered with a non-success status or an unusable error payload.
	#[error("Token endpoint is unavailable: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Underlying I/O failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io {
		/// Raw I/O error.
		#[source]
		source: Arc<std::io::Error>,
	},
}
impl UnavailableError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
impl From<std::io::Error> for UnavailableError {
	fn from(e: std::io::Error) -> Self {
		Self::Io { source: Arc::new(e) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for UnavailableError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Token endpoint answered successfully but the payload cannot become a token record.
#[derive(Clone, Debug, ThisError)]
pub enum MalformedError {
	/// Body is not the expected JSON document (including missing required fields).
	#[error("Token endpoint returned malformed JSON.")]
	Json {
		/// Structured parsing failure with the offending path.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Response carried neither a usable content type nor body.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	UnexpectedResponse {
		/// Summary of the contract violation.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Response carried an `expires_in` value too large to represent.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Response carried a zero `expires_in`.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Response carried a token type other than `Bearer`.
	#[error("Token endpoint issued an unsupported token type `{token_type}`.")]
	UnsupportedTokenType {
		/// Token type reported by the endpoint.
		token_type: String,
	},
	/// Access token cannot be placed in an HTTP header.
	#[error("Access token contains characters that are not valid in an HTTP header.")]
	InvalidAccessToken,
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
}
impl MalformedError {
	pub(crate) fn json(
		source: serde_path_to_error::Error<serde_json::Error>,
		status: Option<u16>,
	) -> Self {
		Self::Json { source: Arc::new(source), status }
	}
}
