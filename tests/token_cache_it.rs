// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use oauth2_gateway::{
	auth::{CredentialSource, TokenSecret},
	clock::ManualClock,
	error::{ConfigError, Error},
	http::ReqwestHttpClient,
	limiter::RateLimiter,
	oauth::{ReqwestTransportErrorMapper, TokenRequestFormat},
	reqwest::Client,
	token_cache::ReqwestTokenCache,
};

const CLIENT_ID: &str = "u-s4t2ud-client";
const CLIENT_SECRET: &str = "s-s4t2ud-secret";

fn insecure_http_client() -> ReqwestHttpClient {
	ReqwestHttpClient::from_builder(
		Client::builder().danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true),
	)
	.expect("Insecure reqwest client should build for the mock server.")
}

fn token_cache(server: &MockServer, credentials: CredentialSource) -> (ReqwestTokenCache, ManualClock) {
	let clock = ManualClock::new();
	let limiter =
		Arc::new(RateLimiter::with_clock(RateLimiter::DEFAULT_MIN_INTERVAL, Arc::new(clock.clone())));
	let endpoint =
		Url::parse(&server.url("/oauth/token")).expect("Mock token endpoint should parse.");
	let cache = ReqwestTokenCache::with_http_client(
		limiter,
		endpoint,
		credentials,
		insecure_http_client(),
		ReqwestTransportErrorMapper,
	)
	.with_clock(Arc::new(clock.clone()));

	(cache, clock)
}

#[tokio::test]
async fn cold_start_posts_json_credentials_once() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("content-type", "application/json")
				.json_body(json!({
					"grant_type": "client_credentials",
					"client_id": CLIENT_ID,
					"client_secret": CLIENT_SECRET,
				}));
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"abc123\",\"token_type\":\"bearer\",\"expires_in\":7200,\"scope\":\"public\"}",
			);
		})
		.await;
	let (cache, clock) = token_cache(&server, CredentialSource::fixed(CLIENT_ID, CLIENT_SECRET));
	let first = cache.get_token().await.expect("Cold exchange should succeed.");
	let second = cache.get_token().await.expect("Cached token should be reused.");
	let third = cache.get_token().await.expect("Cached token should be reused.");

	assert_eq!(first.expose(), "abc123");
	assert_eq!(second, first);
	assert_eq!(third, first);
	assert!(clock.sleeps().is_empty(), "Cached reads must not pass through the gate.");
	assert_eq!(cache.limiter().stats().passes(), 1);
	assert_eq!(cache.metrics().cache_hits(), 2);

	mock.assert_calls_async(1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"guard-token\",\"expires_in\":900}")
				.delay(StdDuration::from_millis(50));
		})
		.await;
	let (cache, _clock) = token_cache(&server, CredentialSource::fixed(CLIENT_ID, CLIENT_SECRET));
	let (first, second, third) = tokio::join!(cache.get_token(), cache.get_token(), cache.get_token());

	for token in [first, second, third] {
		assert_eq!(token.expect("Concurrent call should succeed.").expose(), "guard-token");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn missing_environment_credentials_never_reach_the_network() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).body("{\"access_token\":\"unused\"}");
		})
		.await;
	let (cache, clock) = token_cache(
		&server,
		CredentialSource::env(
			"OAUTH2_GATEWAY_IT_UNSET_CLIENT_ID",
			"OAUTH2_GATEWAY_IT_UNSET_CLIENT_SECRET",
		),
	);
	let err = cache.get_token().await.expect_err("Unset credentials must fail.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::MissingCredential { field: "client_id", .. })
	));
	assert!(clock.sleeps().is_empty());
	assert_eq!(cache.limiter().stats().passes(), 0);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn rejected_credentials_surface_upstream_auth_error() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401).header("content-type", "application/json").body(
				"{\"error\":\"invalid_client\",\"error_description\":\"Client authentication failed.\"}",
			);
		})
		.await;
	let (cache, _clock) = token_cache(&server, CredentialSource::fixed(CLIENT_ID, "wrong"));
	let err = cache.get_token().await.expect_err("Rejected credentials must fail.");

	match err {
		Error::UpstreamAuth { status, reason } => {
			assert_eq!(status, 401);
			assert_eq!(reason.as_deref(), Some("Client authentication failed."));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
	assert!(cache.cached().await.is_none());

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn token_inside_preemptive_window_is_refetched() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"short-lived\",\"expires_in\":300}");
		})
		.await;
	let (cache, clock) = token_cache(&server, CredentialSource::fixed(CLIENT_ID, CLIENT_SECRET));

	cache.get_token().await.expect("First exchange should succeed.");
	clock.advance(StdDuration::from_secs(200));
	cache.get_token().await.expect("Token outside the window should be reused.");

	mock.assert_calls_async(1).await;

	clock.advance(StdDuration::from_secs(45));
	cache.get_token().await.expect("Token inside the window should be refetched.");

	mock.assert_calls_async(2).await;
	assert_eq!(cache.metrics().exchanges(), 2);
}

#[tokio::test]
async fn form_encoding_goes_through_the_oauth_client() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"form-token\",\"token_type\":\"bearer\",\"expires_in\":600}");
		})
		.await;
	let (cache, _clock) = token_cache(&server, CredentialSource::fixed(CLIENT_ID, CLIENT_SECRET));
	let cache = cache.with_format(TokenRequestFormat::Form);
	let token = cache.get_token().await.expect("Form exchange should succeed.");

	assert_eq!(token, TokenSecret::new("form-token"));

	let cached = cache.cached().await.expect("Token should be cached.");

	assert!(cached.expires_at.is_some());

	mock.assert_async().await;
}

#[tokio::test]
async fn zero_expires_in_is_rejected() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"instant\",\"expires_in\":0}");
		})
		.await;
	let (cache, _clock) = token_cache(&server, CredentialSource::fixed(CLIENT_ID, CLIENT_SECRET));
	let err = cache.get_token().await.expect_err("A zero lifetime must be rejected.");

	assert!(err.to_string().contains("expires_in"));
	assert!(cache.cached().await.is_none());
}

#[tokio::test]
async fn redirected_token_endpoint_is_not_followed() {
	let server = MockServer::start_async().await;
	let elsewhere = server.url("/elsewhere/token");
	let redirect_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(302).header("location", elsewhere.as_str());
		})
		.await;
	let elsewhere_mock = server
		.mock_async(|when, then| {
			when.path("/elsewhere/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"hijacked\",\"expires_in\":600}");
		})
		.await;
	let (cache, _clock) = token_cache(&server, CredentialSource::fixed(CLIENT_ID, CLIENT_SECRET));
	let err = cache.get_token().await.expect_err("Redirects must not be followed.");

	assert!(matches!(err, Error::UpstreamAuth { status: 302, .. }));
	assert!(cache.cached().await.is_none());

	redirect_mock.assert_calls_async(1).await;
	elsewhere_mock.assert_calls_async(0).await;
}
