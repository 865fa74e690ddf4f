//! Serde-backed gateway configuration with defaults for the upstream directory API.

// self
use crate::{_prelude::*, auth::CredentialSource, error::ConfigError, oauth::TokenRequestFormat};

/// Runtime configuration consumed by [`GatewayBuilder`](crate::gateway::GatewayBuilder).
///
/// Every field has a default, so an empty document deserializes into a working configuration
/// that reads credentials from `UID`/`SECRET` at the first token exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
	/// API base URL; resource paths are appended to it.
	pub api_base: String,
	/// Token endpoint, either a path below `api_base` or an absolute URL.
	pub token_path: String,
	/// Minimum spacing between two upstream requests, in milliseconds.
	pub min_interval_ms: u64,
	/// Body encoding for the client credentials exchange.
	pub token_request_format: TokenRequestFormat,
	/// How long before expiry a cached token is re-fetched, in seconds.
	pub preemptive_window_secs: u64,
	/// Where client credentials come from.
	pub credentials: CredentialSource,
}
impl GatewayConfig {
	/// Base URL of the upstream directory API.
	pub const DEFAULT_API_BASE: &'static str = "https://api.intra.42.fr";
	/// Default refresh head start, in seconds.
	pub const DEFAULT_PREEMPTIVE_WINDOW_SECS: u64 = 60;
	/// Token path below the API base.
	pub const DEFAULT_TOKEN_PATH: &'static str = "/oauth/token";

	/// Creates a configuration for `api_base` with every other field defaulted.
	pub fn new(api_base: impl Into<String>) -> Self {
		Self { api_base: api_base.into(), ..Default::default() }
	}

	/// Overrides the token endpoint path (or absolute URL).
	pub fn with_token_path(mut self, token_path: impl Into<String>) -> Self {
		self.token_path = token_path.into();

		self
	}

	/// Overrides the gate spacing.
	pub fn with_min_interval(mut self, interval: StdDuration) -> Self {
		self.min_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);

		self
	}

	/// Selects the token request encoding.
	pub fn with_token_request_format(mut self, format: TokenRequestFormat) -> Self {
		self.token_request_format = format;

		self
	}

	/// Overrides the refresh head start.
	pub fn with_preemptive_window_secs(mut self, secs: u64) -> Self {
		self.preemptive_window_secs = secs;

		self
	}

	/// Replaces the credential source.
	pub fn with_credentials(mut self, credentials: CredentialSource) -> Self {
		self.credentials = credentials;

		self
	}

	/// Checks both endpoints without touching the network or the environment.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.api_base_url()?;
		self.token_endpoint()?;

		Ok(())
	}

	/// Parses and validates `api_base`.
	pub fn api_base_url(&self) -> Result<Url, ConfigError> {
		let url = Url::parse(&self.api_base).map_err(|source| ConfigError::InvalidBaseUrl {
			url: self.api_base.clone(),
			source,
		})?;

		ensure_http("api base", url)
	}

	/// Resolves the token endpoint against the API base.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		let path = self.token_path.trim();
		let url = if path.starts_with("http://") || path.starts_with("https://") {
			Url::parse(path).map_err(|_| ConfigError::InvalidEndpoint {
				endpoint: "token",
				url: path.to_owned(),
			})?
		} else if path.starts_with('/') {
			let base = self.api_base_url()?;
			let raw = format!("{}{path}", base.as_str().trim_end_matches('/'));

			Url::parse(&raw)
				.map_err(|_| ConfigError::InvalidEndpoint { endpoint: "token", url: raw.clone() })?
		} else {
			return Err(ConfigError::InvalidEndpoint { endpoint: "token", url: path.to_owned() });
		};

		ensure_http("token", url)
	}

	/// Gate spacing as a [`StdDuration`].
	pub fn min_interval(&self) -> StdDuration {
		StdDuration::from_millis(self.min_interval_ms)
	}

	/// Refresh head start as a [`Duration`].
	pub fn preemptive_window(&self) -> Duration {
		Duration::seconds(i64::try_from(self.preemptive_window_secs).unwrap_or(i64::MAX))
	}
}
impl Default for GatewayConfig {
	fn default() -> Self {
		Self {
			api_base: Self::DEFAULT_API_BASE.into(),
			token_path: Self::DEFAULT_TOKEN_PATH.into(),
			min_interval_ms: 500,
			token_request_format: TokenRequestFormat::default(),
			preemptive_window_secs: Self::DEFAULT_PREEMPTIVE_WINDOW_SECS,
			credentials: CredentialSource::default(),
		}
	}
}

fn ensure_http(endpoint: &'static str, url: Url) -> Result<Url, ConfigError> {
	if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() || url.host().is_none() {
		return Err(ConfigError::InvalidEndpoint { endpoint, url: url.to_string() });
	}

	Ok(url)
}
