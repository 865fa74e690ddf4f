//! Client credentials exchange and transport error mapping.
//!
//! Two body encodings are supported. [`TokenRequestFormat::Json`] posts
//! `{grant_type, client_id, client_secret}` as JSON, which is what the upstream provider
//! documents. [`TokenRequestFormat::Form`] goes through the `oauth2` crate and posts an RFC 6749
//! `application/x-www-form-urlencoded` body with the secret in the request body.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, ClientId, ClientSecret, HttpClientError, HttpRequest,
	HttpResponse, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
	http::{
		Method,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::ClientCredentials,
	error::{ConfigError, ResponseError, TransportError},
	http::{ApiHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs::OpKind,
};

const GRANT_TYPE: &str = "client_credentials";
const JSON_MIME: &str = "application/json";

/// Maps HTTP transport failures into gateway [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a gateway error.
	fn map_transport_error(
		&self,
		op: OpKind,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Transport-agnostic mapper that treats every client-specific failure as a network error.
///
/// Suitable for custom [`ApiHttpClient`] implementations whose error type carries no timeout or
/// builder classification.
#[derive(Clone, Debug, Default)]
pub struct BasicTransportErrorMapper;
impl<E> TransportErrorMapper<E> for BasicTransportErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(
		&self,
		op: OpKind,
		_: Option<&ResponseMetadata>,
		err: HttpClientError<E>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: format!("unclassified {op} failure") }.into(),
		}
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		op: OpKind,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: format!("unclassified {op} failure") }.into(),
		}
	}
}

/// Body encoding used for the client credentials exchange.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRequestFormat {
	/// JSON object with `grant_type`, `client_id`, and `client_secret`.
	#[default]
	Json,
	/// RFC 6749 form body with the client secret posted alongside the grant.
	Form,
}

/// Token fields extracted from a successful exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TokenGrant {
	pub(crate) access_token: String,
	pub(crate) expires_in: Option<u64>,
	pub(crate) scope: Option<String>,
}

#[derive(Serialize)]
struct ClientCredentialsBody<'a> {
	grant_type: &'static str,
	client_id: &'a str,
	client_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<u64>,
	#[serde(default)]
	scope: Option<String>,
}

#[derive(Default, Deserialize)]
struct OAuthErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

/// Performs the client credentials exchange against `endpoint`.
pub(crate) async fn exchange_client_credentials<C, M>(
	http_client: &C,
	mapper: &M,
	endpoint: &Url,
	format: TokenRequestFormat,
	credentials: &ClientCredentials,
) -> Result<TokenGrant>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	match format {
		TokenRequestFormat::Json => exchange_json(http_client, mapper, endpoint, credentials).await,
		TokenRequestFormat::Form => exchange_form(http_client, mapper, endpoint, credentials).await,
	}
}

/// Sends one request through the transport, mapping transport failures with `mapper`.
pub(crate) async fn dispatch<C, M>(
	http_client: &C,
	mapper: &M,
	op: OpKind,
	request: HttpRequest,
) -> Result<HttpResponse>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());

	handle
		.call(request)
		.await
		.map_err(|err| mapper.map_transport_error(op, slot.take().as_ref(), err))
}

async fn exchange_json<C, M>(
	http_client: &C,
	mapper: &M,
	endpoint: &Url,
	credentials: &ClientCredentials,
) -> Result<TokenGrant>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let body = serde_json::to_vec(&ClientCredentialsBody {
		grant_type: GRANT_TYPE,
		client_id: &credentials.client_id,
		client_secret: credentials.client_secret.expose(),
	})
	.map_err(ConfigError::TokenRequestEncode)?;
	let request = oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(endpoint.as_str())
		.header(CONTENT_TYPE, JSON_MIME)
		.header(ACCEPT, JSON_MIME)
		.body(body)
		.map_err(ConfigError::from)?;
	let response = dispatch(http_client, mapper, OpKind::TokenExchange, request).await?;
	let status = response.status();

	if !status.is_success() {
		return Err(Error::UpstreamAuth {
			status: status.as_u16(),
			reason: describe_oauth_error(response.body()),
		});
	}

	let deserializer = &mut serde_json::Deserializer::from_slice(response.body());
	let parsed: TokenEndpointResponse = serde_path_to_error::deserialize(deserializer)
		.map_err(|source| ResponseError::TokenResponseParse {
			source,
			status: Some(status.as_u16()),
		})?;

	Ok(TokenGrant {
		access_token: parsed.access_token,
		expires_in: parsed.expires_in,
		scope: parsed.scope,
	})
}

async fn exchange_form<C, M>(
	http_client: &C,
	mapper: &M,
	endpoint: &Url,
	credentials: &ClientCredentials,
) -> Result<TokenGrant>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let token_url = TokenUrl::new(endpoint.to_string())
		.map_err(|source| ConfigError::InvalidBaseUrl { url: endpoint.to_string(), source })?;
	let oauth_client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
		.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
		.set_auth_type(AuthType::RequestBody)
		.set_token_uri(token_url);
	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());
	let response = oauth_client
		.exchange_client_credentials()
		.request_async(&handle)
		.await
		.map_err(|err| map_form_error(mapper, slot.take(), err))?;
	let scope = response.scopes().map(|scopes| {
		scopes.iter().map(|scope| scope.as_str()).collect::<Vec<_>>().join(" ")
	});

	Ok(TokenGrant {
		access_token: response.access_token().secret().to_owned(),
		expires_in: response.expires_in().map(|lifetime| lifetime.as_secs()),
		scope,
	})
}

fn map_form_error<E, M>(
	mapper: &M,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta.as_ref().and_then(|value| value.status);
	let rejected = status.filter(|code| !(200..300).contains(code));

	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = response
				.error_description()
				.cloned()
				.unwrap_or_else(|| response.error().as_ref().to_owned());

			Error::UpstreamAuth { status: status.unwrap_or(400), reason: Some(reason) }
		},
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(OpKind::TokenExchange, meta.as_ref(), error),
		RequestTokenError::Parse(source, _body) => match rejected {
			Some(status) => Error::UpstreamAuth { status, reason: None },
			None => ResponseError::TokenResponseParse { source, status }.into(),
		},
		RequestTokenError::Other(message) => match rejected {
			Some(status) => Error::UpstreamAuth { status, reason: Some(message) },
			None => ResponseError::UnexpectedTokenResponse { message, status }.into(),
		},
	}
}

fn describe_oauth_error(body: &[u8]) -> Option<String> {
	let parsed: OAuthErrorBody = serde_json::from_slice(body).unwrap_or_default();

	parsed.error_description.or(parsed.error)
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		let status =
			meta.and_then(|value| value.status).or_else(|| err.status().map(|code| code.as_u16()));

		return TransportError::Timeout { status }.into();
	}

	TransportError::from(err).into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_body_uses_client_credentials_grant() {
		let body = serde_json::to_value(ClientCredentialsBody {
			grant_type: GRANT_TYPE,
			client_id: "u-abc",
			client_secret: "s-xyz",
		})
		.expect("Token request body should serialize.");

		assert_eq!(
			body,
			serde_json::json!({
				"grant_type": "client_credentials",
				"client_id": "u-abc",
				"client_secret": "s-xyz",
			})
		);
	}

	#[test]
	fn oauth_error_description_wins_over_code() {
		let body = br#"{"error":"invalid_client","error_description":"Client authentication failed"}"#;

		assert_eq!(describe_oauth_error(body), Some("Client authentication failed".into()));
		assert_eq!(describe_oauth_error(br#"{"error":"invalid_client"}"#), Some("invalid_client".into()));
		assert_eq!(describe_oauth_error(b"<html>bad gateway</html>"), None);
	}

	#[test]
	fn token_request_format_defaults_to_json() {
		assert_eq!(TokenRequestFormat::default(), TokenRequestFormat::Json);
		assert_eq!(
			serde_json::from_str::<TokenRequestFormat>("\"form\"")
				.expect("Form format should deserialize."),
			TokenRequestFormat::Form
		);
	}
}
