// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
// self
use oauth2_gateway::{
	auth::CredentialSource,
	clock::ManualClock,
	config::GatewayConfig,
	error::Error,
	gateway::{GatewayBuilder, ReqwestGateway},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	probe::BodyShape,
	reqwest::Client,
};

fn insecure_http_client() -> ReqwestHttpClient {
	ReqwestHttpClient::from_builder(
		Client::builder().danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true),
	)
	.expect("Insecure reqwest client should build for the mock server.")
}

fn build_gateway(server: &MockServer, clock: &ManualClock) -> ReqwestGateway {
	let config = GatewayConfig::new(server.base_url())
		.with_credentials(CredentialSource::fixed("u-probe", "s-probe"));

	GatewayBuilder::new(config)
		.with_clock(Arc::new(clock.clone()))
		.build_with_http_client(insecure_http_client(), ReqwestTransportErrorMapper)
		.expect("Gateway should build against the mock server.")
}

#[tokio::test]
async fn probe_records_each_endpoint_and_summarizes() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"probe-token\",\"expires_in\":7200}");
		})
		.await;
	let campus_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/campus");
			then.status(200).header("content-type", "application/json").body(
				"[{\"id\":1,\"name\":\"Paris\"},{\"id\":2,\"name\":\"Lyon\"},{\"id\":3,\"name\":\"Nice\"}]",
			);
		})
		.await;
	let cursus_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/cursus");
			then.status(403).body("{}");
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/users/1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":1,\"login\":\"jdoe\"}");
		})
		.await;
	let clock = ManualClock::new();
	let gateway = build_gateway(&server, &clock);
	let report = gateway
		.probe(&["/v2/campus", "/v2/cursus", "/v2/users/1"])
		.await
		.expect("Probe should complete.");

	assert_eq!(report.summary.total, 3);
	assert_eq!(report.summary.successful, 2);
	assert_eq!(report.summary.failed, 1);
	assert_eq!(report.summary.average_elapsed, StdDuration::from_millis(500));

	let campus = &report.results[0];

	assert!(campus.success);
	assert_eq!(campus.status, Some(200));
	assert_eq!(
		campus.shape,
		Some(BodyShape::Array {
			length: 3,
			fields: vec!["id".into(), "name".into()],
			sample: vec![
				serde_json::json!({ "id": 1, "name": "Paris" }),
				serde_json::json!({ "id": 2, "name": "Lyon" }),
			],
		})
	);

	let cursus = &report.results[1];

	assert!(!cursus.success);
	assert_eq!(cursus.status, Some(403));
	assert_eq!(cursus.error.as_deref(), Some("403: Forbidden"));
	assert_eq!(cursus.shape, None);
	assert_eq!(
		report.results[2].shape,
		Some(BodyShape::Object {
			fields: vec!["id".into(), "login".into()],
			sample: serde_json::json!({ "id": 1, "login": "jdoe" }),
		})
	);

	token_mock.assert_calls_async(1).await;
	campus_mock.assert_async().await;
	cursus_mock.assert_async().await;
	user_mock.assert_async().await;
}

#[tokio::test]
async fn probe_aborts_when_the_token_cannot_be_obtained() {
	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401).body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let campus_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/campus");
			then.status(200).body("[]");
		})
		.await;
	let clock = ManualClock::new();
	let gateway = build_gateway(&server, &clock);
	let err = gateway.probe(&["/v2/campus"]).await.expect_err("Probe must abort without a token.");

	assert!(matches!(err, Error::UpstreamAuth { status: 401, .. }));

	campus_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn invalid_paths_are_recorded_not_fatal() {
	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"probe-token\"}");
		})
		.await;
	let _languages_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/languages");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let clock = ManualClock::new();
	let gateway = build_gateway(&server, &clock);
	let report = gateway
		.probe(&["v2/no-leading-slash", "/v2/languages"])
		.await
		.expect("Probe should complete.");

	assert_eq!(report.results[0].status, None);
	assert!(report.results[0].error.as_deref().is_some_and(|error| error.contains("must start with")));
	assert!(report.results[1].success);
	assert_eq!(report.summary.failed, 1);
}
