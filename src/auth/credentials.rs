//! Immutable client-credentials configuration and its builder.

// std
use std::env;
// crates.io
use oauth2::{ClientId, ClientSecret, Scope, TokenUrl};
// self
use crate::{_prelude::*, error::ConfigError};

/// Grant type sent when none is configured.
pub const DEFAULT_GRANT_TYPE: &str = "client_credentials";
/// Cache-control query value sent when none is configured.
pub const DEFAULT_CACHE_CONTROL: &str = "no-cache";

const ENV_CLIENT_ID: &str = "DATAMINER_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "DATAMINER_CLIENT_SECRET";
const ENV_TOKEN_URL: &str = "DATAMINER_TOKEN_URL";
const ENV_AUTH_SCOPE: &str = "DATAMINER_AUTH_SCOPE";
const ENV_GRANT_TYPE: &str = "DATAMINER_GRANT_TYPE";
const ENV_ENVIRONMENT: &str = "DATAMINER_ENVIRONMENT";

/// Which vendor API deployment the credentials belong to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Production APIs.
	#[default]
	Production,
	/// Sandbox APIs.
	Sandbox,
}
impl Environment {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Production => "production",
			Environment::Sandbox => "sandbox",
		}
	}

	/// Returns `true` for the production deployment.
	pub const fn is_production(self) -> bool {
		matches!(self, Environment::Production)
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let value = s.trim();

		if value.eq_ignore_ascii_case("production") || value.eq_ignore_ascii_case("prod") {
			Ok(Environment::Production)
		} else if value.eq_ignore_ascii_case("sandbox") {
			Ok(Environment::Sandbox)
		} else {
			Err(ConfigError::UnknownEnvironment { value: value.to_owned() })
		}
	}
}

/// OAuth 2.0 client-credentials configuration supplied at startup.
///
/// Secrets are wrapped in `oauth2` newtypes so `Debug` output stays redacted.
#[derive(Clone, Debug)]
pub struct Credentials {
	/// Client identifier.
	pub client_id: ClientId,
	/// Client secret.
	pub client_secret: ClientSecret,
	/// Token endpoint without query parameters.
	pub token_url: TokenUrl,
	/// Requested access scope, if any.
	pub scope: Option<Scope>,
	/// Grant type label.
	pub grant_type: String,
	/// Cache-control value forwarded as a query parameter.
	pub cache_control: String,
	/// Production or sandbox deployment.
	pub environment: Environment,
}
impl Credentials {
	/// Returns a builder that validates required fields.
	pub fn builder() -> CredentialsBuilder {
		CredentialsBuilder::default()
	}

	/// Loads credentials from `DATAMINER_*` environment variables.
	///
	/// Reads:
	/// - `DATAMINER_CLIENT_ID`, `DATAMINER_CLIENT_SECRET`, `DATAMINER_TOKEN_URL` (required)
	/// - `DATAMINER_AUTH_SCOPE`, `DATAMINER_GRANT_TYPE` (optional)
	/// - `DATAMINER_ENVIRONMENT`: `production` (default) or `sandbox`
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Loads credentials through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&'static str) -> Option<String>,
	{
		let required = |name: &'static str| {
			lookup(name)
				.filter(|value| !value.trim().is_empty())
				.ok_or(ConfigError::MissingEnv { name })
		};
		let optional = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
		let mut builder = Self::builder()
			.client_id(required(ENV_CLIENT_ID)?)
			.client_secret(required(ENV_CLIENT_SECRET)?)
			.token_url(required(ENV_TOKEN_URL)?);

		if let Some(scope) = optional(ENV_AUTH_SCOPE) {
			builder = builder.scope(scope);
		}
		if let Some(grant_type) = optional(ENV_GRANT_TYPE) {
			builder = builder.grant_type(grant_type);
		}
		if let Some(environment) = optional(ENV_ENVIRONMENT) {
			builder = builder.environment(environment.parse()?);
		}

		builder.build()
	}

	/// Builds the token endpoint URL carrying the grant as query parameters.
	pub fn token_request_url(&self) -> Url {
		let mut url = self.token_url.url().clone();

		{
			let mut query = url.query_pairs_mut();

			query
				.append_pair("grant_type", &self.grant_type)
				.append_pair("client_id", self.client_id.as_str())
				.append_pair("client_secret", self.client_secret.secret())
				.append_pair("cache-control", &self.cache_control);

			if let Some(scope) = &self.scope {
				query.append_pair("scope", scope.as_str());
			}
		}

		url
	}
}

/// Builder for [`Credentials`].
#[derive(Debug, Default)]
pub struct CredentialsBuilder {
	client_id: Option<String>,
	client_secret: Option<ClientSecret>,
	token_url: Option<String>,
	scope: Option<String>,
	grant_type: Option<String>,
	cache_control: Option<String>,
	environment: Environment,
}
impl CredentialsBuilder {
	/// Sets the client identifier.
	pub fn client_id(mut self, value: impl Into<String>) -> Self {
		self.client_id = Some(value.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, value: impl Into<String>) -> Self {
		self.client_secret = Some(ClientSecret::new(value.into()));

		self
	}

	/// Sets the token endpoint.
	pub fn token_url(mut self, value: impl Into<String>) -> Self {
		self.token_url = Some(value.into());

		self
	}

	/// Sets the requested scope.
	pub fn scope(mut self, value: impl Into<String>) -> Self {
		self.scope = Some(value.into());

		self
	}

	/// Overrides the grant type (defaults to `client_credentials`).
	pub fn grant_type(mut self, value: impl Into<String>) -> Self {
		self.grant_type = Some(value.into());

		self
	}

	/// Overrides the cache-control query value (defaults to `no-cache`).
	pub fn cache_control(mut self, value: impl Into<String>) -> Self {
		self.cache_control = Some(value.into());

		self
	}

	/// Selects the production or sandbox deployment.
	pub fn environment(mut self, environment: Environment) -> Self {
		self.environment = environment;

		self
	}

	/// Consumes the builder and validates the resulting credentials.
	pub fn build(self) -> Result<Credentials, ConfigError> {
		let client_id = self
			.client_id
			.filter(|value| !value.is_empty())
			.ok_or(ConfigError::MissingCredential { field: "client id" })?;
		let client_secret = self
			.client_secret
			.filter(|value| !value.secret().is_empty())
			.ok_or(ConfigError::MissingCredential { field: "client secret" })?;
		let token_url = self.token_url.ok_or(ConfigError::MissingCredential { field: "token URL" })?;
		let token_url =
			TokenUrl::new(token_url).map_err(|source| ConfigError::InvalidTokenUrl { source })?;

		Ok(Credentials {
			client_id: ClientId::new(client_id),
			client_secret,
			token_url,
			scope: self.scope.filter(|value| !value.is_empty()).map(Scope::new),
			grant_type: self.grant_type.unwrap_or_else(|| DEFAULT_GRANT_TYPE.into()),
			cache_control: self.cache_control.unwrap_or_else(|| DEFAULT_CACHE_CONTROL.into()),
			environment: self.environment,
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	fn credentials() -> Credentials {
		Credentials::builder()
			.client_id("client-id")
			.client_secret("s3cr&t")
			.token_url("https://id.example.com/oauth2/token")
			.scope("api.read")
			.build()
			.expect("Credentials fixture should build.")
	}

	#[test]
	fn token_request_url_carries_grant_as_query() {
		let url = credentials().token_request_url();
		let pairs: Vec<(String, String)> =
			url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();

		assert_eq!(url.path(), "/oauth2/token");
		assert_eq!(
			pairs,
			vec![
				("grant_type".into(), "client_credentials".into()),
				("client_id".into(), "client-id".into()),
				("client_secret".into(), "s3cr&t".into()),
				("cache-control".into(), "no-cache".into()),
				("scope".into(), "api.read".into()),
			]
		);
	}

	#[test]
	fn token_request_url_omits_missing_scope() {
		let credentials = Credentials::builder()
			.client_id("client-id")
			.client_secret("secret")
			.token_url("https://id.example.com/token")
			.build()
			.expect("Credentials without scope should build.");

		assert!(!credentials.token_request_url().query_pairs().any(|(key, _)| key == "scope"));
	}

	#[test]
	fn builder_rejects_missing_fields() {
		let err = Credentials::builder()
			.client_secret("secret")
			.token_url("https://id.example.com/token")
			.build()
			.expect_err("Missing client id should be rejected.");

		assert!(matches!(err, ConfigError::MissingCredential { field: "client id" }));

		let err = Credentials::builder()
			.client_id("id")
			.client_secret("secret")
			.token_url("not a url")
			.build()
			.expect_err("Malformed token URL should be rejected.");

		assert!(matches!(err, ConfigError::InvalidTokenUrl { .. }));
	}

	#[test]
	fn debug_output_redacts_secret() {
		let rendered = format!("{:?}", credentials());

		assert!(!rendered.contains("s3cr&t"));
	}

	#[test]
	fn lookup_reads_environment_variables() {
		let vars: HashMap<&str, &str> = HashMap::from([
			("DATAMINER_CLIENT_ID", "env-id"),
			("DATAMINER_CLIENT_SECRET", "env-secret"),
			("DATAMINER_TOKEN_URL", "https://id.example.com/token"),
			("DATAMINER_ENVIRONMENT", "Sandbox"),
		]);
		let credentials = Credentials::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
			.expect("Lookup with required variables should succeed.");

		assert_eq!(credentials.client_id.as_str(), "env-id");
		assert_eq!(credentials.environment, Environment::Sandbox);
		assert_eq!(credentials.grant_type, DEFAULT_GRANT_TYPE);
		assert!(credentials.scope.is_none());

		let err = Credentials::from_lookup(|name| {
			(name != "DATAMINER_CLIENT_SECRET").then(|| vars.get(name).map(|v| v.to_string())).flatten()
		})
		.expect_err("Missing secret should be rejected.");

		assert!(matches!(err, ConfigError::MissingEnv { name: "DATAMINER_CLIENT_SECRET" }));
	}

	#[test]
	fn environment_parses_known_labels() {
		assert_eq!("production".parse::<Environment>().ok(), Some(Environment::Production));
		assert_eq!(" SANDBOX ".parse::<Environment>().ok(), Some(Environment::Sandbox));
		assert!("staging".parse::<Environment>().is_err());
	}
}
