//! Client credentials token cache with singleflight exchanges and expiry tracking.
//!
//! [`TokenCache::get_token`] answers from the cached [`AccessToken`] while it is outside the
//! refresh window. Otherwise it resolves the client credentials, passes the shared
//! [`RateLimiter`] gate, and performs exactly one client credentials exchange. The cache slot is
//! an async mutex held across the exchange, so concurrent cold callers piggy-back on the same
//! in-flight request instead of stampeding the token endpoint.

mod metrics;

pub use metrics::TokenMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CredentialSource, TokenSecret},
	clock::{Clock, SystemClock},
	error::ResponseError,
	http::ApiHttpClient,
	limiter::RateLimiter,
	oauth::{self, TokenRequestFormat, TransportErrorMapper},
	obs::{self, OpKind, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Token cache specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenCache = TokenCache<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Lazily populated bearer token cache backed by the client credentials grant.
pub struct TokenCache<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	limiter: Arc<RateLimiter>,
	clock: Arc<dyn Clock>,
	token_endpoint: Url,
	credentials: CredentialSource,
	format: TokenRequestFormat,
	preemptive_window: Duration,
	slot: AsyncMutex<Option<AccessToken>>,
	metrics: Arc<TokenMetrics>,
}
impl<C, M> TokenCache<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Default head start taken before a token's reported expiry.
	pub const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

	/// Creates a cache that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		limiter: Arc<RateLimiter>,
		token_endpoint: Url,
		credentials: CredentialSource,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			limiter,
			clock: Arc::new(SystemClock),
			token_endpoint,
			credentials,
			format: TokenRequestFormat::default(),
			preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW,
			slot: AsyncMutex::new(None),
			metrics: Default::default(),
		}
	}

	/// Replaces the clock used to stamp and age cached tokens.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Selects the token request body encoding.
	pub fn with_format(mut self, format: TokenRequestFormat) -> Self {
		self.format = format;

		self
	}

	/// Overrides how long before expiry a token is re-fetched (defaults to 60 seconds).
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Token endpoint the exchange posts to.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// Gate shared with the resource requests of this process.
	pub fn limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Counters describing cache hits, exchanges, and failures.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.metrics
	}

	/// Returns a valid bearer token, exchanging client credentials only when needed.
	///
	/// A cached token outside the refresh window is returned without any network call or gate
	/// wait. Missing credentials fail with a configuration error before anything is sent, and a
	/// non-success status from the token endpoint fails with [`Error::UpstreamAuth`].
	pub async fn get_token(&self) -> Result<TokenSecret> {
		const KIND: OpKind = OpKind::TokenExchange;

		let mut slot = self.slot.lock().await;
		let now = self.clock.now_utc();

		if let Some(current) =
			slot.as_ref().filter(|token| !token.needs_refresh_at(now, self.preemptive_window))
		{
			self.metrics.record_cache_hit();

			return Ok(current.secret.clone());
		}

		let span = OpSpan::new(KIND, "get_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		match span.instrument(self.exchange()).await {
			Ok(token) => {
				obs::record_op_outcome(KIND, OpOutcome::Success);

				let secret = token.secret.clone();

				*slot = Some(token);

				Ok(secret)
			},
			Err(err) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %err, "Client credentials exchange failed.");

				obs::record_op_outcome(KIND, OpOutcome::Failure);
				self.metrics.record_failure();

				Err(err)
			},
		}
	}

	/// Returns the cached record without performing any I/O.
	pub async fn cached(&self) -> Option<AccessToken> {
		self.slot.lock().await.clone()
	}

	/// Discards the cached token so the next call performs a fresh exchange.
	pub async fn invalidate(&self) {
		if self.slot.lock().await.take().is_some() {
			self.metrics.record_invalidation();
		}
	}

	/// Discards the cached token only if it is still `secret`.
	///
	/// Returns `false` when another caller already replaced the token, in which case the newer
	/// token is kept.
	pub async fn invalidate_matching(&self, secret: &TokenSecret) -> bool {
		let mut slot = self.slot.lock().await;

		if slot.as_ref().is_some_and(|token| &token.secret == secret) {
			*slot = None;

			self.metrics.record_invalidation();

			true
		} else {
			false
		}
	}

	async fn exchange(&self) -> Result<AccessToken> {
		let credentials = self.credentials.resolve()?;

		self.limiter.wait().await;
		self.metrics.record_exchange();

		let grant = oauth::exchange_client_credentials(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			&self.token_endpoint,
			self.format,
			&credentials,
		)
		.await?;
		let issued_at = self.clock.now_utc();
		let lifetime = grant.expires_in.map(|secs| token_lifetime(issued_at, secs)).transpose()?;
		let mut token = AccessToken::new(grant.access_token, issued_at, lifetime);

		if let Some(scope) = grant.scope {
			token = token.with_scope(scope);
		}

		#[cfg(feature = "tracing")]
		tracing::debug!(expires_at = ?token.expires_at, "Cached a new access token.");

		Ok(token)
	}
}
impl<C, M> Debug for TokenCache<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("format", &self.format)
			.field("preemptive_window", &self.preemptive_window)
			.field("metrics", &self.metrics)
			.finish()
	}
}

fn token_lifetime(issued_at: OffsetDateTime, expires_in: u64) -> Result<Duration, ResponseError> {
	let out_of_range = || ResponseError::ExpiresInOutOfRange { value: expires_in };
	let secs = i64::try_from(expires_in).map_err(|_| out_of_range())?;

	if secs <= 0 {
		return Err(out_of_range());
	}

	let lifetime = Duration::seconds(secs);

	issued_at.checked_add(lifetime).map(|_| lifetime).ok_or_else(out_of_range)
}
