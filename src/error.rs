//! Gateway-level error types shared by the gate, the token cache, and resource fetches.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem (missing credentials, invalid URLs).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Upstream answered with a body the gateway could not interpret.
	#[error(transparent)]
	Response(#[from] ResponseError),

	/// Token endpoint rejected the client credentials exchange.
	#[error("Token endpoint rejected the client credentials exchange with HTTP {status}.")]
	UpstreamAuth {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Provider-supplied OAuth `error`/`error_description`, when present.
		reason: Option<String>,
	},
	/// Gated resource request returned a non-success status that is fatal for the call.
	#[error("Upstream request to `{path}` failed with HTTP {status}.")]
	UpstreamRequest {
		/// HTTP status code returned by the resource endpoint.
		status: u16,
		/// Resource path (including query) that failed.
		path: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl Error {
	/// Returns the upstream HTTP status tied to this error, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::UpstreamAuth { status, .. } | Self::UpstreamRequest { status, .. } =>
				Some(*status),
			Self::Response(ResponseError::TokenResponseParse { status, .. })
			| Self::Response(ResponseError::ResourceParse { status, .. }) => *status,
			_ => None,
		}
	}

	/// Returns `true` for local configuration failures, which are never worth retrying.
	pub fn is_config(&self) -> bool {
		matches!(self, Self::Config(_))
	}
}

/// Configuration and validation failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Client id or secret is absent or empty.
	#[error("Missing API credential `{field}` (expected from {origin}).")]
	MissingCredential {
		/// Which credential is missing (`client_id` or `client_secret`).
		field: &'static str,
		/// Where the gateway looked for it.
		origin: String,
	},
	/// API base URL cannot be parsed.
	#[error("API base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// Raw URL that failed validation.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// An endpoint uses a scheme or shape the gateway cannot call.
	#[error("The {endpoint} endpoint is unusable: {url}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Resource paths must be absolute (start with `/`).
	#[error("Resource path `{path}` must start with `/`.")]
	InvalidResourcePath {
		/// Offending path.
		path: String,
	},
	/// Token request body could not be encoded.
	#[error("Token request body could not be encoded.")]
	TokenRequestEncode(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Upstream payloads that could not be turned into gateway values.
#[derive(Debug, ThisError)]
pub enum ResponseError {
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint answered in a way the OAuth client could not classify.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	UnexpectedTokenResponse {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint returned an `expires_in` outside the supported range.
	#[error("The expires_in value {value} is out of the supported range.")]
	ExpiresInOutOfRange {
		/// Raw value returned by the provider.
		value: u64,
	},
	/// Resource endpoint responded with JSON that does not match the requested type.
	#[error("Resource `{path}` returned JSON that could not be decoded.")]
	ResourceParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// Resource path (including query).
		path: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete before the transport's deadline.
	#[error("Request to the upstream API timed out.")]
	Timeout {
		/// HTTP status code observed before the timeout, if any.
		status: Option<u16>,
	},
	/// HTTP client reported a failure without a structured source.
	#[error("HTTP client error occurred while calling the upstream API: {message}.")]
	Other {
		/// Message reported by the client.
		message: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
