//! Shared fixtures for integration tests: credentials, a scripted transport, and clients.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use tokio::time::Instant;
// self
use dataminer_kit::{
	auth::{Credentials, Environment},
	client::ApiClient,
	config::{ClientOptions, RetryPolicy, TokenFailurePolicy},
	http::{ApiTransport, TransportErrorKind, TransportFuture},
	oauth2::{
		HttpRequest, HttpResponse,
		http::{StatusCode, header::AUTHORIZATION},
	},
	url::Url,
};

pub const CLIENT_ID: &str = "scripted-client";
pub const CLIENT_SECRET: &str = "scripted-secret";
pub const TOKEN_URL: &str = "https://auth.example.com/token";

pub fn credentials(token_url: &str, environment: Environment) -> Credentials {
	Credentials::builder()
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.token_url(token_url)
		.scope("api.read")
		.environment(environment)
		.build()
		.expect("Test credentials should build.")
}

pub fn api_url() -> Url {
	Url::parse("https://api.example.com/v1/items").expect("Test API URL should parse.")
}

pub fn options(max_attempts: u32) -> ClientOptions {
	ClientOptions::default()
		.with_retry(RetryPolicy::immediate(max_attempts))
		.with_token_failure(TokenFailurePolicy::ReturnError)
}

/// One scripted API reply.
#[derive(Clone, Copy, Debug)]
pub enum Step {
	Status(u16),
	Timeout,
	Connect,
}

#[derive(Debug)]
pub enum FakeTransportError {
	Timeout,
	Connect,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Timeout => write!(f, "Operation timed out."),
			Self::Connect => write!(f, "Connection refused."),
		}
	}
}
impl StdError for FakeTransportError {}

/// Transport that answers the token endpoint itself and replays scripted API replies.
///
/// Once the script runs dry (or when `repeat` is set) API calls keep answering with the
/// fallback step; the default fallback is `200 {"ok":true}`.
#[derive(Default)]
pub struct ScriptedTransport {
	steps: Mutex<VecDeque<Step>>,
	fallback: Mutex<Option<Step>>,
	token_body: Mutex<Option<&'static str>>,
	token_calls: AtomicUsize,
	api_authorizations: Mutex<Vec<String>>,
	api_instants: Mutex<Vec<Instant>>,
}
impl ScriptedTransport {
	pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
		Self { steps: Mutex::new(steps.into_iter().collect()), ..Default::default() }
	}

	pub fn always(step: Step) -> Self {
		let transport = Self::default();

		*transport.fallback.lock() = Some(step);

		transport
	}

	pub fn with_token_body(self, body: &'static str) -> Self {
		*self.token_body.lock() = Some(body);

		self
	}

	pub fn token_calls(&self) -> usize {
		self.token_calls.load(Ordering::SeqCst)
	}

	pub fn api_calls(&self) -> usize {
		self.authorizations().len()
	}

	pub fn authorizations(&self) -> Vec<String> {
		self.api_authorizations.lock().clone()
	}

	/// Tokio clock readings taken as each API call arrived.
	pub fn api_instants(&self) -> Vec<Instant> {
		self.api_instants.lock().clone()
	}

	fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse, FakeTransportError> {
		if request.uri().path() == "/token" {
			let n = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
			let body = match *self.token_body.lock() {
				Some(body) => body.to_owned(),
				None => format!("{{\"access_token\":\"token-{n}\",\"token_type\":\"bearer\"}}"),
			};

			return Ok(response(200, &body));
		}

		let authorization = request
			.headers()
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.unwrap_or_default()
			.to_owned();

		self.api_authorizations.lock().push(authorization);
		self.api_instants.lock().push(Instant::now());

		let step = self.steps.lock().pop_front().or(*self.fallback.lock());

		match step {
			None => Ok(response(200, "{\"ok\":true}")),
			Some(Step::Status(status)) => Ok(response(status, "{\"detail\":\"scripted\"}")),
			Some(Step::Timeout) => Err(FakeTransportError::Timeout),
			Some(Step::Connect) => Err(FakeTransportError::Connect),
		}
	}
}
impl ApiTransport for ScriptedTransport {
	type TransportError = FakeTransportError;

	fn send(
		&self,
		request: HttpRequest,
		_timeout: Duration,
	) -> TransportFuture<'_, FakeTransportError> {
		let outcome = self.dispatch(&request);

		Box::pin(async move { outcome })
	}

	fn classify_error(&self, error: &FakeTransportError) -> TransportErrorKind {
		match error {
			FakeTransportError::Timeout => TransportErrorKind::Timeout,
			FakeTransportError::Connect => TransportErrorKind::Connect,
		}
	}
}

pub fn response(status: u16, body: &str) -> HttpResponse {
	let mut response = HttpResponse::new(body.as_bytes().to_vec());

	*response.status_mut() = StatusCode::from_u16(status).expect("Status should be valid.");

	response
}

pub fn scripted_client(
	transport: Arc<ScriptedTransport>,
	max_attempts: u32,
) -> ApiClient<ScriptedTransport> {
	client_with_options(transport, options(max_attempts))
}

pub fn client_with_options(
	transport: Arc<ScriptedTransport>,
	options: ClientOptions,
) -> ApiClient<ScriptedTransport> {
	ApiClient::with_transport(credentials(TOKEN_URL, Environment::Sandbox), transport)
		.with_options(options)
}
