//! Client id/secret pairs and the lazily resolved sources they come from.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Resolved client credentials used for the client-credentials grant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredentials {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret; redacted in logs.
	pub client_secret: TokenSecret,
}
impl ClientCredentials {
	/// Builds credentials after checking that neither half is blank.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let client_id = client_id.into();
		let client_secret = TokenSecret::new(client_secret);

		if client_id.trim().is_empty() {
			return Err(ConfigError::MissingCredential {
				field: "client_id",
				origin: "static configuration".into(),
			});
		}
		if client_secret.is_blank() {
			return Err(ConfigError::MissingCredential {
				field: "client_secret",
				origin: "static configuration".into(),
			});
		}

		Ok(Self { client_id, client_secret })
	}
}

/// Where the gateway obtains its client credentials.
///
/// Resolution happens at the first token exchange rather than at construction, so a process can
/// start without credentials and only fail the first call that needs them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSource {
	/// Read both values from environment variables at resolution time.
	Env {
		/// Variable holding the client id.
		client_id_var: String,
		/// Variable holding the client secret.
		client_secret_var: String,
	},
	/// Use values fixed at configuration time.
	Static {
		/// OAuth 2.0 client identifier.
		client_id: String,
		/// OAuth 2.0 client secret.
		client_secret: TokenSecret,
	},
}
impl CredentialSource {
	/// Environment variable conventionally holding the client id.
	pub const DEFAULT_CLIENT_ID_VAR: &'static str = "UID";
	/// Environment variable conventionally holding the client secret.
	pub const DEFAULT_CLIENT_SECRET_VAR: &'static str = "SECRET";

	/// Reads credentials from the provided environment variables.
	pub fn env(client_id_var: impl Into<String>, client_secret_var: impl Into<String>) -> Self {
		Self::Env {
			client_id_var: client_id_var.into(),
			client_secret_var: client_secret_var.into(),
		}
	}

	/// Uses a fixed id/secret pair.
	pub fn fixed(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self::Static {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
		}
	}

	/// Resolves the source into usable credentials.
	///
	/// Absent, non-unicode, or blank values fail with [`ConfigError::MissingCredential`].
	pub fn resolve(&self) -> Result<ClientCredentials, ConfigError> {
		match self {
			Self::Env { client_id_var, client_secret_var } => {
				let client_id = read_env("client_id", client_id_var)?;
				let client_secret = read_env("client_secret", client_secret_var)?;

				Ok(ClientCredentials { client_id, client_secret: TokenSecret::new(client_secret) })
			},
			Self::Static { client_id, client_secret } =>
				ClientCredentials::new(client_id.as_str(), client_secret.expose()),
		}
	}
}
impl Default for CredentialSource {
	fn default() -> Self {
		Self::env(Self::DEFAULT_CLIENT_ID_VAR, Self::DEFAULT_CLIENT_SECRET_VAR)
	}
}

fn read_env(field: &'static str, var: &str) -> Result<String, ConfigError> {
	match std::env::var(var) {
		Ok(value) if !value.trim().is_empty() => Ok(value),
		_ => Err(ConfigError::MissingCredential {
			field,
			origin: format!("environment variable `{var}`"),
		}),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn static_source_rejects_blank_values() {
		let err = CredentialSource::fixed("", "secret")
			.resolve()
			.expect_err("Blank client ids must be rejected.");

		assert!(matches!(err, ConfigError::MissingCredential { field: "client_id", .. }));

		let err = CredentialSource::fixed("client", "   ")
			.resolve()
			.expect_err("Blank client secrets must be rejected.");

		assert!(matches!(err, ConfigError::MissingCredential { field: "client_secret", .. }));
	}

	#[test]
	fn env_source_reports_the_missing_variable() {
		let source = CredentialSource::env(
			"OAUTH2_GATEWAY_UNSET_CLIENT_ID_FOR_TESTS",
			"OAUTH2_GATEWAY_UNSET_CLIENT_SECRET_FOR_TESTS",
		);
		let err = source.resolve().expect_err("Unset variables must be rejected.");

		match err {
			ConfigError::MissingCredential { field, origin } => {
				assert_eq!(field, "client_id");
				assert!(origin.contains("OAUTH2_GATEWAY_UNSET_CLIENT_ID_FOR_TESTS"));
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn default_source_reads_uid_and_secret() {
		assert_eq!(CredentialSource::default(), CredentialSource::env("UID", "SECRET"));
	}

	#[test]
	fn static_source_deserializes_and_redacts() {
		let source: CredentialSource = serde_json::from_str(
			r#"{"kind":"static","client_id":"u-abc","client_secret":"s-xyz"}"#,
		)
		.expect("Static credential source should deserialize.");
		let credentials = source.resolve().expect("Static credentials should resolve.");

		assert_eq!(credentials.client_id, "u-abc");
		assert_eq!(credentials.client_secret.expose(), "s-xyz");
		assert!(!format!("{credentials:?}").contains("s-xyz"));
	}
}
