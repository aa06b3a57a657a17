//! Request signing contracts that attach manager-issued tokens to arbitrary HTTP clients.

// crates.io
use oauth2::{
	HttpRequest,
	http::{HeaderValue, header::AUTHORIZATION},
};
#[cfg(feature = "reqwest")] use reqwest::RequestBuilder;
// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	error::MalformedError,
	http::TokenHttpClient,
	manager::TokenManager,
	oauth::TransportErrorMapper,
};

/// Describes how to attach a [`TokenRecord`] to an outbound request without
/// constraining the HTTP client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects authorization state derived from the
	/// [`TokenRecord`].
	fn attach_token(&self, request: Request, record: &TokenRecord) -> Result<Request, Error>;
}

/// Signer that sets `Authorization: Bearer <access_token>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl BearerSigner {
	/// Builds the sensitive `Authorization` header value for `record`.
	pub fn header_value(record: &TokenRecord) -> Result<HeaderValue> {
		let mut value = HeaderValue::from_str(&record.authorization_value())
			.map_err(|_| MalformedError::InvalidAccessToken)?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl RequestSignerExt<HttpRequest, Error> for BearerSigner {
	fn attach_token(&self, mut request: HttpRequest, record: &TokenRecord) -> Result<HttpRequest> {
		request.headers_mut().insert(AUTHORIZATION, Self::header_value(record)?);

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl RequestSignerExt<RequestBuilder, Error> for BearerSigner {
	fn attach_token(
		&self,
		request: RequestBuilder,
		record: &TokenRecord,
	) -> Result<RequestBuilder> {
		Ok(request.header(AUTHORIZATION, Self::header_value(record)?))
	}
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Obtains a valid token and lets `signer` attach it to `request`.
	pub async fn sign<R, S>(&self, signer: &S, request: R) -> Result<R>
	where
		S: ?Sized + RequestSignerExt<R, Error>,
	{
		let record = self.get_token().await?;

		signer.attach_token(request, &record)
	}

	/// Adds `Authorization: Bearer <access_token>` to a reqwest request.
	#[cfg(feature = "reqwest")]
	pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
		self.sign(&BearerSigner, request).await
	}
}
