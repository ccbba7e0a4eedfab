//! Client-level error types shared across the token, request, and output layers.

// self
use crate::{_prelude::*, auth::Environment};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Output directory or page file failure.
	#[error(transparent)]
	Output(#[from] OutputError),

	/// Upstream rejected the request with a non-retryable 4xx status.
	#[error("Client error {status}: aborting API call.")]
	Client {
		/// HTTP status code returned by the API.
		status: u16,
		/// Body preview returned with the rejection.
		body: String,
	},
	/// Every attempt in the retry budget failed.
	#[error("API call failed after {attempts} attempts.")]
	RetriesExhausted {
		/// Number of attempts issued before giving up.
		attempts: u32,
		/// Failure observed on the final attempt.
		#[source]
		last: TransientError,
	},
	/// No usable bearer token could be obtained.
	#[error(
		"Unable to retrieve a valid token for client `{client_id}` against the {environment} APIs."
	)]
	TokenAcquisition {
		/// Client identifier used for the grant.
		client_id: String,
		/// Production or sandbox indicator in effect.
		environment: Environment,
		/// Underlying token endpoint failure.
		#[source]
		reason: TokenError,
	},
	/// A successful response body did not decode into the requested type.
	#[error("Response body could not be decoded.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Header value contains characters that cannot be sent.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
	},
	/// Request payload could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
	/// Token endpoint URL cannot be parsed.
	#[error("Token URL is invalid.")]
	InvalidTokenUrl {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Required credential field was never supplied.
	#[error("Credentials are missing the {field}.")]
	MissingCredential {
		/// Field label.
		field: &'static str,
	},
	/// Required environment variable is unset or empty.
	#[error("Environment variable `{name}` is missing or empty.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// Environment indicator is neither production nor sandbox.
	#[error("Unknown environment `{value}`; expected `production` or `sandbox`.")]
	UnknownEnvironment {
		/// Rejected value.
		value: String,
	},
}
/// Failures of a single attempt that the request loop retries.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// The attempt exceeded its timeout.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The connection could not be established or was dropped.
	#[error("Connection error occurred.")]
	Connection {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Any other transport failure.
	#[error("Request failed before a response arrived.")]
	Request {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Upstream answered with a 5xx status.
	#[error("Server error {status}.")]
	ServerStatus {
		/// HTTP status code.
		status: u16,
		/// Body preview returned with the failure.
		body: String,
	},
	/// Upstream rejected the bearer token (401/403).
	#[error("Authorization rejected with status {status}.")]
	AuthRejected {
		/// HTTP status code.
		status: u16,
	},
}
impl TransientError {
	/// HTTP status code attached to the failure, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::ServerStatus { status, .. } | Self::AuthRejected { status } => Some(*status),
			_ => None,
		}
	}
}

/// Token endpoint failures.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// No response arrived from the token endpoint.
	#[error("Token endpoint could not be reached.")]
	Request {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint returned status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Body preview returned with the failure.
		body: String,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint response carried no `access_token`.
	#[error("Token endpoint response is missing access_token.")]
	MissingAccessToken,
	/// Token request could not be built.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Filesystem failures raised by the output helpers.
#[derive(Debug, ThisError)]
pub enum OutputError {
	/// Directory could not be removed or recreated.
	#[error("Failed to prepare directory {path}.")]
	Directory {
		/// Directory path.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Page file could not be written.
	#[error("Failed to write {path}.")]
	Write {
		/// File path.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Page payload could not be serialized.
	#[error("Failed to serialize page {path}.")]
	Serialize {
		/// File path.
		path: String,
		/// Underlying serializer failure.
		#[source]
		source: serde_json::Error,
	},
}
