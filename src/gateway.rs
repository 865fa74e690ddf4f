//! Gated fetch: token, gate, bearer GET, status policy.
//!
//! [`Gateway`] owns the transport, the API base URL, and the [`TokenCache`] and [`RateLimiter`]
//! it shares with every other caller in the process. Each data call obtains a token, passes the
//! gate, issues the GET, and retries exactly once with a fresh token when the resource endpoint
//! answers 401.

pub mod listing;
pub mod policy;
pub mod request;

pub use listing::*;
pub use policy::*;
pub use request::*;

// crates.io
use oauth2::{
	HttpResponse,
	http::{
		Method, StatusCode,
		header::{ACCEPT, AUTHORIZATION},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	clock::{Clock, SystemClock},
	config::GatewayConfig,
	error::{ConfigError, ResponseError},
	http::{ApiHttpClient, parse_retry_after},
	limiter::RateLimiter,
	oauth::{self, TransportErrorMapper},
	obs::{self, OpKind, OpOutcome, OpSpan},
	token_cache::TokenCache,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport stack.
pub type ReqwestGateway = Gateway<ReqwestHttpClient, ReqwestTransportErrorMapper>;

const JSON_MIME: &str = "application/json";

/// Uninterpreted response of a gated GET.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Path and query that produced the response.
	pub path: String,
	/// Retry-After hint, if the upstream sent one.
	pub retry_after: Option<Duration>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON, reporting the failing JSON path on mismatch.
	pub fn json<T>(&self) -> Result<T, ResponseError>
	where
		T: DeserializeOwned,
	{
		let deserializer = &mut serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(deserializer).map_err(|source| {
			ResponseError::ResourceParse {
				source,
				path: self.path.clone(),
				status: Some(self.status),
			}
		})
	}

	/// Converts a non-success response into [`Error::UpstreamRequest`].
	pub fn into_error(self) -> Error {
		Error::UpstreamRequest { status: self.status, path: self.path, retry_after: self.retry_after }
	}

	fn from_http(path: String, response: HttpResponse) -> Self {
		Self {
			status: response.status().as_u16(),
			retry_after: parse_retry_after(response.headers()),
			path,
			body: response.into_body(),
		}
	}
}

/// Client for the upstream REST API that gates and authenticates every call.
pub struct Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	limiter: Arc<RateLimiter>,
	tokens: Arc<TokenCache<C, M>>,
	api_base: Url,
}
impl<C, M> Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Assembles a gateway from already constructed parts.
	///
	/// `tokens` should share `limiter` so token exchanges and data calls are spaced together.
	pub fn from_parts(
		api_base: Url,
		limiter: Arc<RateLimiter>,
		tokens: Arc<TokenCache<C, M>>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			limiter,
			tokens,
			api_base,
		}
	}

	/// Base URL resource paths are appended to.
	pub fn api_base(&self) -> &Url {
		&self.api_base
	}

	/// Request gate shared with the token cache.
	pub fn limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Token cache used to authenticate data calls.
	pub fn tokens(&self) -> &Arc<TokenCache<C, M>> {
		&self.tokens
	}

	/// Performs a gated GET and returns the response without interpreting its status.
	///
	/// A 401 invalidates the token that was sent and the request is repeated once with a fresh
	/// token. The second response is returned whatever its status.
	pub async fn fetch_raw(&self, request: &ResourceRequest) -> Result<RawResponse> {
		const KIND: OpKind = OpKind::ResourceFetch;

		let url = request.url(&self.api_base)?;
		let path = path_and_query(&url);
		let span = OpSpan::new(KIND, "fetch");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let token = self.tokens.get_token().await?;
				let response = self.send(&url, &token).await?;

				if response.status() != StatusCode::UNAUTHORIZED {
					return Ok(response);
				}

				#[cfg(feature = "tracing")]
				tracing::warn!(path = %path, "Resource endpoint rejected the token; retrying once.");

				self.tokens.invalidate_matching(&token).await;

				let token = self.tokens.get_token().await?;

				self.send(&url, &token).await
			})
			.await;

		match result {
			Ok(response) => {
				let raw = RawResponse::from_http(path, response);
				let outcome = match policy::classify_status(raw.status) {
					StatusDisposition::Success => OpOutcome::Success,
					StatusDisposition::Soft(_) => OpOutcome::SoftFailure,
					StatusDisposition::Fatal => OpOutcome::Failure,
				};

				obs::record_op_outcome(KIND, outcome);

				Ok(raw)
			},
			Err(err) => {
				obs::record_op_outcome(KIND, OpOutcome::Failure);

				Err(err)
			},
		}
	}

	/// Performs a gated GET and decodes a success body; any other status is an error.
	pub async fn fetch<T>(&self, request: &ResourceRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let raw = self.fetch_raw(request).await?;

		if !raw.is_success() {
			return Err(raw.into_error());
		}

		Ok(raw.json()?)
	}

	/// Performs a gated GET of a JSON array under the soft failure policy.
	///
	/// 429, 403, and 404 yield an empty [`Listing`] carrying a [`SoftFailure`]; other non-success
	/// statuses are errors.
	pub async fn fetch_listing<T>(&self, request: &ResourceRequest) -> Result<Listing<T>>
	where
		T: DeserializeOwned,
	{
		let raw = self.fetch_raw(request).await?;

		match policy::classify_status(raw.status) {
			StatusDisposition::Success =>
				Ok(Listing::new(raw.json()?, request.page(), request.per_page())),
			StatusDisposition::Soft(kind) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(
					path = %raw.path,
					status = raw.status,
					signal = %kind,
					"Upstream soft failure; returning an empty page."
				);

				let retry_after = match kind {
					SoftFailureKind::RateLimited => raw.retry_after,
					_ => None,
				};

				Ok(Listing::soft_failure(
					SoftFailure { kind, retry_after },
					request.page(),
					request.per_page(),
				))
			},
			StatusDisposition::Fatal => Err(raw.into_error()),
		}
	}

	async fn send(&self, url: &Url, token: &TokenSecret) -> Result<HttpResponse> {
		self.limiter.wait().await;

		let request = oauth2::http::Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.header(AUTHORIZATION, token.bearer_header())
			.header(ACCEPT, JSON_MIME)
			.body(Vec::new())
			.map_err(ConfigError::from)?;

		oauth::dispatch(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			OpKind::ResourceFetch,
			request,
		)
		.await
	}
}
impl<C, M> Debug for Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("api_base", &self.api_base.as_str())
			.field("limiter", &self.limiter)
			.field("tokens", &self.tokens)
			.finish()
	}
}

/// Builds a [`Gateway`] and its collaborators from a [`GatewayConfig`].
pub struct GatewayBuilder {
	config: GatewayConfig,
	clock: Arc<dyn Clock>,
	limiter: Option<Arc<RateLimiter>>,
}
impl GatewayBuilder {
	/// Starts a builder for `config` on the system clock.
	pub fn new(config: GatewayConfig) -> Self {
		Self { config, clock: Arc::new(SystemClock), limiter: None }
	}

	/// Uses `clock` for the gate and for token expiry.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Shares an existing gate instead of creating one from `min_interval_ms`.
	pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
		self.limiter = Some(limiter);

		self
	}

	/// Validates the configuration and wires the gateway onto the provided transport.
	pub fn build_with_http_client<C, M>(
		self,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Gateway<C, M>, ConfigError>
	where
		C: ?Sized + ApiHttpClient,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		let Self { config, clock, limiter } = self;
		let api_base = config.api_base_url()?;
		let token_endpoint = config.token_endpoint()?;
		let limiter = limiter.unwrap_or_else(|| {
			Arc::new(RateLimiter::with_clock(config.min_interval(), clock.clone()))
		});
		let http_client: Arc<C> = http_client.into();
		let mapper: Arc<M> = mapper.into();
		let tokens = TokenCache::<C, M>::with_http_client(
			limiter.clone(),
			token_endpoint,
			config.credentials.clone(),
			http_client.clone(),
			mapper.clone(),
		)
		.with_clock(clock)
		.with_format(config.token_request_format)
		.with_preemptive_window(config.preemptive_window());

		#[cfg(feature = "tracing")]
		tracing::debug!(
			api_base = %api_base,
			token_endpoint = %tokens.token_endpoint(),
			min_interval_ms = limiter.min_interval().as_millis() as u64,
			"Gateway configured."
		);

		Ok(Gateway::from_parts(api_base, limiter, Arc::new(tokens), http_client, mapper))
	}

	#[cfg(feature = "reqwest")]
	/// Builds a gateway on a default reqwest transport.
	pub fn build(self) -> Result<ReqwestGateway, ConfigError> {
		self.build_with_http_client(ReqwestHttpClient::new()?, ReqwestTransportErrorMapper)
	}
}
impl Debug for GatewayBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GatewayBuilder")
			.field("config", &self.config)
			.field("shared_limiter", &self.limiter.is_some())
			.finish()
	}
}
