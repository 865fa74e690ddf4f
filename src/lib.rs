//! Rate-limited, token-caching gateway for OAuth 2.0 client-credentials protected REST APIs,
//! with typed helpers for the student directory it was built for.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod http;
pub mod limiter;
pub mod oauth;
pub mod obs;
pub mod probe;
pub mod token_cache;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName},
	};
	// self
	use crate::{
		auth::CredentialSource,
		clock::{Clock, ManualClock},
		config::GatewayConfig,
		gateway::{Gateway, GatewayBuilder},
		http::{ApiHttpClient, ResponseMetadata, ResponseMetadataSlot},
		limiter::RateLimiter,
		oauth::BasicTransportErrorMapper,
		token_cache::TokenCache,
	};

	/// Gateway type alias used by scripted-transport tests.
	pub type ScriptedGateway = Gateway<ScriptedHttpClient, BasicTransportErrorMapper>;
	/// Token cache type alias used by scripted-transport tests.
	pub type ScriptedTokenCache = TokenCache<ScriptedHttpClient, BasicTransportErrorMapper>;

	/// Base URL used by [`build_scripted_gateway`].
	pub const SCRIPTED_API_BASE: &str = "http://api.test";

	/// Request captured by [`ScriptedHttpClient`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// HTTP method.
		pub method: String,
		/// Absolute request URI.
		pub uri: String,
		/// `Authorization` header, if sent.
		pub authorization: Option<String>,
		/// `Accept` header, if sent.
		pub accept: Option<String>,
		/// `Content-Type` header, if sent.
		pub content_type: Option<String>,
		/// Request body.
		pub body: Vec<u8>,
	}

	/// Error injected by [`ScriptedHttpClient::push_failure`].
	#[derive(Debug, ThisError)]
	#[error("Scripted transport failure: {0}.")]
	pub struct ScriptedTransportError(pub String);

	/// In-memory transport that replays queued responses in order and records every request.
	///
	/// Calls made after the queue is drained fail with [`HttpClientError::Other`].
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedHttpClient(Arc<Mutex<ScriptedState>>);
	#[derive(Debug, Default)]
	struct ScriptedState {
		replies: VecDeque<Result<HttpResponse, String>>,
		requests: Vec<RecordedRequest>,
	}
	impl ScriptedHttpClient {
		/// Queues a JSON response.
		pub fn push_json(&self, status: u16, body: serde_json::Value) -> &Self {
			let response = oauth2::http::Response::builder()
				.status(status)
				.header(CONTENT_TYPE, "application/json")
				.body(body.to_string().into_bytes())
				.expect("Scripted JSON response should build.");

			self.push_response(response)
		}

		/// Queues an arbitrary response.
		pub fn push_response(&self, response: HttpResponse) -> &Self {
			self.0.lock().replies.push_back(Ok(response));

			self
		}

		/// Queues a transport failure.
		pub fn push_failure(&self, message: impl Into<String>) -> &Self {
			self.0.lock().replies.push_back(Err(message.into()));

			self
		}

		/// Every request seen so far, in order.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.0.lock().requests.clone()
		}

		/// Number of requests seen so far.
		pub fn request_count(&self) -> usize {
			self.0.lock().requests.len()
		}
	}
	impl ApiHttpClient for ScriptedHttpClient {
		type Handle = ScriptedHandle;
		type TransportError = ScriptedTransportError;

		fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
			ScriptedHandle { client: self.clone(), slot }
		}
	}

	/// Handle returned by [`ScriptedHttpClient`].
	#[derive(Clone, Debug)]
	pub struct ScriptedHandle {
		client: ScriptedHttpClient,
		slot: ResponseMetadataSlot,
	}
	impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
		type Error = HttpClientError<ScriptedTransportError>;
		type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			let header = |name: HeaderName| {
				request.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
			};
			let recorded = RecordedRequest {
				method: request.method().to_string(),
				uri: request.uri().to_string(),
				authorization: header(AUTHORIZATION),
				accept: header(ACCEPT),
				content_type: header(CONTENT_TYPE),
				body: request.body().clone(),
			};
			let reply = {
				let mut state = self.client.0.lock();

				state.requests.push(recorded);
				state.replies.pop_front()
			};

			self.slot.take();

			let outcome = match reply {
				Some(Ok(response)) => {
					self.slot.store(ResponseMetadata::from_response(&response));

					Ok(response)
				},
				Some(Err(message)) =>
					Err(HttpClientError::Reqwest(Box::new(ScriptedTransportError(message)))),
				None => Err(HttpClientError::Other("no scripted response left".into())),
			};

			Box::pin(std::future::ready(outcome))
		}
	}

	/// Builds a token cache on `transport` whose gate and expiry run on `clock`.
	pub fn build_scripted_token_cache(
		transport: &ScriptedHttpClient,
		clock: &ManualClock,
		credentials: CredentialSource,
	) -> ScriptedTokenCache {
		let clock: Arc<dyn Clock> = Arc::new(clock.clone());
		let limiter =
			Arc::new(RateLimiter::with_clock(RateLimiter::DEFAULT_MIN_INTERVAL, clock.clone()));
		let endpoint = Url::parse(&format!("{SCRIPTED_API_BASE}/oauth/token"))
			.expect("Scripted token endpoint should parse.");

		ScriptedTokenCache::with_http_client(
			limiter,
			endpoint,
			credentials,
			transport.clone(),
			BasicTransportErrorMapper,
		)
		.with_clock(clock)
	}

	/// Builds a gateway on `transport` with static credentials and the default gate spacing.
	pub fn build_scripted_gateway(
		transport: &ScriptedHttpClient,
		clock: &ManualClock,
	) -> ScriptedGateway {
		let config = GatewayConfig::new(SCRIPTED_API_BASE)
			.with_credentials(CredentialSource::fixed("test-client", "test-secret"));

		GatewayBuilder::new(config)
			.with_clock(Arc::new(clock.clone()))
			.build_with_http_client(transport.clone(), BasicTransportErrorMapper)
			.expect("Scripted gateway should build.")
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::{Duration as StdDuration, Instant},
	};

	pub use async_lock::Mutex as AsyncMutex;
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
#[cfg(test)] use {color_eyre as _, httpmock as _};
