//! Lists students and campuses through the gateway against a local mock of the directory API,
//! then probes a few endpoints to show which ones the credentials can reach.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_gateway::{
	auth::CredentialSource,
	config::GatewayConfig,
	directory::PageQuery,
	gateway::{GatewayBuilder, ReqwestGateway},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":7200}",
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/campus");
			then.status(200).header("content-type", "application/json").body(
				"[{\"id\":1,\"name\":\"Paris\",\"active\":true,\"public\":true},{\"id\":21,\"name\":\"Amsterdam\",\"active\":true,\"public\":true}]",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/campus/21/users");
			then.status(200).header("content-type", "application/json").body(
				"[{\"id\":7,\"login\":\"jdoe\",\"first_name\":\"Jane\",\"last_name\":\"Doe\",\"active?\":true}]",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/users");
			then.status(429).header("Retry-After", "2");
		})
		.await;

	let config = GatewayConfig::new(server.base_url())
		.with_credentials(CredentialSource::fixed("demo-client", "super-secret"));
	// The mock server presents a self-signed certificate.
	let http_client = ReqwestHttpClient::from_builder(
		Client::builder().danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true),
	)?;
	let gateway: ReqwestGateway =
		GatewayBuilder::new(config).build_with_http_client(http_client, ReqwestTransportErrorMapper)?;

	for campus in gateway.active_campuses().await? {
		let students = gateway.campus_students(campus.id, PageQuery::default()).await?;

		println!("{} ({} students on page 1).", campus.name, students.total_count());

		for student in &students.items {
			println!("  {} <{}>", student.display_name(), student.login);
		}
	}

	let everyone = gateway.students(PageQuery::new(1, 100)).await?;

	if let Some(signal) = &everyone.signal {
		println!("{}: {}.", signal.header(), signal.message());
	}

	let report = gateway.probe(&["/v2/campus", "/v2/users"]).await?;

	println!(
		"Probed {} endpoints, {} reachable, average {:?}.",
		report.summary.total, report.summary.successful, report.summary.average_elapsed
	);

	token_mock.assert_calls_async(1).await;

	Ok(())
}
