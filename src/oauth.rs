//! Client-credentials exchange facade over the `oauth2` crate.
//!
//! [`BasicFacade`] owns the configured `oauth2` client, issues
//! `grant_type=client_credentials` requests through a [`TokenHttpClient`], turns successful
//! responses into [`TokenRecord`] values, and classifies every failure into the crate's
//! [`Error`] taxonomy using the response metadata captured by the transport.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret as OAuthClientSecret, EndpointNotSet,
	EndpointSet, HttpClientError, RequestTokenError, TokenResponse, TokenUrl,
	basic::{
		BasicClient, BasicErrorResponse, BasicErrorResponseType, BasicRequestTokenError,
		BasicTokenResponse, BasicTokenType,
	},
};
// self
#[cfg(feature = "reqwest")] use crate::error::ConfigError;
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenRecord, TokenType},
	config::{ClientAuthMethod, TokenManagerConfig},
	error::{MalformedError, UnavailableError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const STATUS_UNAUTHORIZED: u16 = 401;

/// Maps HTTP transport failures into [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => UnavailableError::from(inner).into(),
			HttpClientError::Other(message) => unavailable(
				format!("HTTP client error occurred while calling the token endpoint: {message}"),
				meta,
			),
			_ => unavailable("HTTP client error occurred while calling the token endpoint", meta),
		}
	}
}

/// Performs client-credentials exchanges against a single token endpoint.
pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		config: &TokenManagerConfig,
		credentials: &ClientCredentials,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Self {
		let token_url = TokenUrl::from_url(config.token_endpoint.clone());
		let mut oauth_client =
			BasicClient::new(OAuthClientId::new(credentials.client_id().to_string()))
				.set_client_secret(OAuthClientSecret::new(
					credentials.client_secret().expose().to_owned(),
				))
				.set_token_uri(token_url);

		if matches!(config.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Self { oauth_client, http_client, error_mapper }
	}

	/// Runs one `grant_type=client_credentials` exchange; `issued_at` anchors the expiry.
	pub(crate) async fn exchange_client_credentials(
		&self,
		issued_at: OffsetDateTime,
	) -> Result<TokenRecord> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

		map_token_response(&response, issued_at)
	}
}

pub(crate) fn map_token_response(
	response: &BasicTokenResponse,
	issued_at: OffsetDateTime,
) -> Result<TokenRecord> {
	if *response.token_type() != BasicTokenType::Bearer {
		let token_type = match response.token_type() {
			BasicTokenType::Extension(value) => value.clone(),
			other => format!("{other:?}"),
		};

		return Err(MalformedError::UnsupportedTokenType { token_type }.into());
	}

	let expires_in = response.expires_in().ok_or(MalformedError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| MalformedError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(MalformedError::NonPositiveExpiresIn.into());
	}

	let expires_at = issued_at
		.checked_add(Duration::seconds(expires_in))
		.ok_or(MalformedError::ExpiresInOutOfRange)?;

	TokenRecord::builder()
		.access_token(response.access_token().secret().to_owned())
		.token_type(TokenType::Bearer)
		.issued_at(issued_at)
		.expires_at(expires_at)
		.build()
		.map_err(|err| MalformedError::from(err).into())
}

pub(crate) fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta = meta.as_ref();

	match meta_status(meta) {
		Some(STATUS_UNAUTHORIZED) => Error::InvalidCredentials {
			reason: match &err {
				RequestTokenError::ServerResponse(response) => describe_server_error(response),
				_ => "HTTP 401 Unauthorized".into(),
			},
			status: Some(STATUS_UNAUTHORIZED),
		},
		Some(status) if !(200..300).contains(&status) => match err {
			RequestTokenError::ServerResponse(response)
				if rejects_client(response.error()) =>
				Error::InvalidCredentials {
					reason: describe_server_error(&response),
					status: Some(status),
				},
			RequestTokenError::ServerResponse(response) =>
				unavailable(describe_server_error(&response), meta),
			RequestTokenError::Request(error) => mapper.map_transport_error(meta, error),
			_ => unavailable(format!("HTTP {status}"), meta),
		},
		_ => match err {
			RequestTokenError::Request(error) => mapper.map_transport_error(meta, error),
			RequestTokenError::Parse(error, _body) =>
				MalformedError::json(error, meta_status(meta)).into(),
			RequestTokenError::ServerResponse(response) => MalformedError::UnexpectedResponse {
				message: describe_server_error(&response),
				status: meta_status(meta),
			}
			.into(),
			RequestTokenError::Other(message) =>
				MalformedError::UnexpectedResponse { message, status: meta_status(meta) }.into(),
		},
	}
}

fn rejects_client(error: &BasicErrorResponseType) -> bool {
	matches!(
		error,
		BasicErrorResponseType::InvalidClient | BasicErrorResponseType::UnauthorizedClient
	)
}

fn describe_server_error(response: &BasicErrorResponse) -> String {
	match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		let status = meta_status(meta).or_else(|| err.status().map(|code| code.as_u16()));

		return UnavailableError::TokenEndpoint {
			message: "request timed out while calling the token endpoint".into(),
			status,
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	UnavailableError::from(err).into()
}

fn unavailable(message: impl Into<String>, meta: Option<&ResponseMetadata>) -> Error {
	UnavailableError::TokenEndpoint {
		message: message.into(),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
