//! Client identifier and confidential client credentials used for the token exchange.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, auth::Secret};

const CLIENT_ID_MAX_LEN: usize = 256;

/// Error returned when client credential validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum CredentialsError {
	/// The client identifier was empty.
	#[error("Client identifier cannot be empty.")]
	EmptyClientId,
	/// The client identifier contains whitespace or control characters.
	#[error("Client identifier contains whitespace or control characters.")]
	InvalidClientIdCharacters,
	/// The client identifier exceeded the allowed length.
	#[error("Client identifier exceeds {max} characters.")]
	ClientIdTooLong {
		/// Maximum permitted character count.
		max: usize,
	},
	/// The client secret was empty.
	#[error("Client secret cannot be empty.")]
	EmptyClientSecret,
}

/// OAuth 2.0 client identifier, validated on construction.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);
impl ClientId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, CredentialsError> {
		let view = value.as_ref();

		validate_client_id(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for ClientId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for ClientId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<ClientId> for String {
	fn from(value: ClientId) -> Self {
		value.0
	}
}
impl TryFrom<String> for ClientId {
	type Error = CredentialsError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_client_id(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for ClientId {
	type Err = CredentialsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ClientId({})", self.0)
	}
}
impl Display for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Immutable confidential-client credentials presented to the token endpoint.
///
/// The secret is only ever exposed to the exchange facade when it builds the token request;
/// `Debug` output redacts it.
#[derive(Clone)]
pub struct ClientCredentials {
	client_id: ClientId,
	client_secret: Secret,
}
impl ClientCredentials {
	/// Validates and wraps a client id + secret pair.
	pub fn new(
		client_id: impl AsRef<str>,
		client_secret: impl Into<String>,
	) -> Result<Self, CredentialsError> {
		let client_id = ClientId::new(client_id)?;
		let client_secret = Secret::new(client_secret);

		if client_secret.is_empty() {
			return Err(CredentialsError::EmptyClientSecret);
		}

		Ok(Self { client_id, client_secret })
	}

	/// Client identifier.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	pub(crate) fn client_secret(&self) -> &Secret {
		&self.client_secret
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

fn validate_client_id(view: &str) -> Result<(), CredentialsError> {
	if view.is_empty() {
		return Err(CredentialsError::EmptyClientId);
	}
	if view.chars().any(|c| c.is_whitespace() || c.is_control()) {
		return Err(CredentialsError::InvalidClientIdCharacters);
	}
	if view.chars().count() > CLIENT_ID_MAX_LEN {
		return Err(CredentialsError::ClientIdTooLong { max: CLIENT_ID_MAX_LEN });
	}

	Ok(())
}
