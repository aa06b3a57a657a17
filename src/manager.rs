//! Client-credentials token manager with leeway-aware caching and single-flight renewal.
//!
//! [`TokenManager::get_token`] serves the cached record while `now + leeway < expires_at`.
//! On a miss, the first caller installs one shared exchange future in the manager's slot and
//! every caller that misses while it runs awaits the same future, so N concurrent misses cost
//! one token endpoint round trip and all N observe the same record or the same error.
//!
//! The exchange future writes its own result back: on success it replaces the cached record,
//! and in every case it clears the in-flight marker. A failure is never cached, so the next
//! caller after a failed exchange starts a fresh one. Dropping a `get_token` future only stops
//! that caller from waiting; the exchange stays in the slot and whoever polls next drives it.

mod metrics;

pub use metrics::ExchangeMetrics;

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, ClientId, TokenRecord},
	clock::{Clock, SystemClock},
	config::TokenManagerConfig,
	http::TokenHttpClient,
	oauth::{BasicFacade, TransportErrorMapper},
	obs::{self, Operation, OperationSpan, Outcome},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

type InFlight = Shared<BoxFuture<'static, Result<TokenRecord>>>;

#[cfg(feature = "reqwest")]
/// Token manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

#[derive(Default)]
struct TokenSlot {
	cached: Option<TokenRecord>,
	in_flight: Option<InFlight>,
}

/// Owns acquisition, caching, and renewal of a bearer token for one set of client credentials.
///
/// Clones are cheap and share the cache, the in-flight exchange, and the metrics.
pub struct TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Arc<TokenManagerConfig>,
	client_id: ClientId,
	facade: Arc<BasicFacade<C, M>>,
	clock: Arc<dyn Clock>,
	metrics: Arc<ExchangeMetrics>,
	slot: Arc<Mutex<TokenSlot>>,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: TokenManagerConfig,
		credentials: ClientCredentials,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self::with_clock(config, credentials, http_client, mapper, Arc::new(SystemClock))
	}

	/// Same as [`TokenManager::with_http_client`] but reads time from `clock`.
	pub fn with_clock(
		config: TokenManagerConfig,
		credentials: ClientCredentials,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let facade = BasicFacade::new(&config, &credentials, http_client.into(), mapper.into());

		Self {
			config: Arc::new(config),
			client_id: credentials.client_id().clone(),
			facade: Arc::new(facade),
			clock,
			metrics: Default::default(),
			slot: Default::default(),
		}
	}

	/// Returns a token that is valid at the moment of the call.
	///
	/// Serves the cached record when it is still usable, otherwise performs (or joins) a
	/// client-credentials exchange.
	pub async fn get_token(&self) -> Result<TokenRecord> {
		const OPERATION: Operation = Operation::GetToken;

		let span = OperationSpan::new(OPERATION, "get_token");

		span.instrument(async move {
			let (in_flight, joined) = {
				let now = self.clock.now();
				let mut slot = self.slot.lock();

				if let Some(record) = slot
					.cached
					.as_ref()
					.filter(|record| record.is_usable_at(now, self.config.leeway))
				{
					self.metrics.record_cache_hit();
					obs::record(OPERATION, Outcome::CacheHit);

					return Ok(record.clone());
				}

				if let Some(in_flight) = slot.in_flight.clone() {
					(in_flight, true)
				} else {
					let in_flight = self.start_exchange();

					slot.in_flight = Some(in_flight.clone());

					(in_flight, false)
				}
			};

			if joined {
				self.metrics.record_coalesced();
				obs::record(OPERATION, Outcome::Coalesced);
			} else {
				obs::record(OPERATION, Outcome::Attempt);
			}

			let result = in_flight.await;

			match &result {
				Ok(_) => obs::record(OPERATION, Outcome::Success),
				Err(_) => obs::record(OPERATION, Outcome::Failure),
			}

			result
		})
		.await
	}

	/// Returns the `Authorization` header value (`Bearer <access_token>`) for a valid token.
	pub async fn authorization_header(&self) -> Result<String> {
		Ok(self.get_token().await?.authorization_value())
	}

	/// Returns the cached record, if any, without checking expiry or touching the network.
	pub fn cached(&self) -> Option<TokenRecord> {
		self.slot.lock().cached.clone()
	}

	/// Drops the cached record so the next [`TokenManager::get_token`] performs an exchange.
	///
	/// An exchange already in flight is left alone and will repopulate the cache when it
	/// succeeds.
	pub fn invalidate(&self) -> Option<TokenRecord> {
		self.slot.lock().cached.take()
	}

	/// Returns `true` while a token endpoint exchange is running.
	pub fn is_exchange_in_flight(&self) -> bool {
		self.slot.lock().in_flight.is_some()
	}

	/// Counters describing how calls were served.
	pub fn metrics(&self) -> &ExchangeMetrics {
		&self.metrics
	}

	/// Configuration the manager was built with.
	pub fn config(&self) -> &TokenManagerConfig {
		&self.config
	}

	/// Client identifier presented to the token endpoint.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	fn start_exchange(&self) -> InFlight {
		const OPERATION: Operation = Operation::Exchange;

		let facade = Arc::clone(&self.facade);
		let clock = Arc::clone(&self.clock);
		let metrics = Arc::clone(&self.metrics);
		// Weak, because the slot owns this future while it runs.
		let slot = Arc::downgrade(&self.slot);
		let span = OperationSpan::new(OPERATION, "client_credentials");
		let exchange = async move {
			metrics.record_exchange();
			obs::record(OPERATION, Outcome::Attempt);

			let result = facade.exchange_client_credentials(clock.now()).await;

			if let Some(slot) = slot.upgrade() {
				let mut slot = slot.lock();

				slot.in_flight = None;

				if let Ok(record) = &result {
					slot.cached = Some(record.clone());
				}
			}

			match &result {
				Ok(_) => {
					metrics.record_success();
					obs::record(OPERATION, Outcome::Success);
				},
				Err(_) => {
					metrics.record_failure();
					obs::record(OPERATION, Outcome::Failure);
				},
			}

			result
		};

		span.instrument(exchange).boxed().shared()
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager backed by a reqwest client built from `config`.
	pub fn new(config: TokenManagerConfig, credentials: ClientCredentials) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_config(&config)?;

		Ok(Self::with_http_client(config, credentials, http_client, ReqwestTransportErrorMapper))
	}
}
impl<C, M> Clone for TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			config: Arc::clone(&self.config),
			client_id: self.client_id.clone(),
			facade: Arc::clone(&self.facade),
			clock: Arc::clone(&self.clock),
			metrics: Arc::clone(&self.metrics),
			slot: Arc::clone(&self.slot),
		}
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let slot = self.slot.lock();

		f.debug_struct("TokenManager")
			.field("token_endpoint", &self.config.token_endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("cached", &slot.cached)
			.field("exchange_in_flight", &slot.in_flight.is_some())
			.finish()
	}
}
