//! Authenticated API client: token lifecycle plus the bounded retry state machine.
//!
//! [`ApiClient::request`] drives one logical request through these transitions:
//!
//! ```text
//! INIT -(token absent or stale)-> ACQUIRE_TOKEN -> SEND
//! SEND -success-> DONE
//! SEND -5xx/timeout/connection error-> WAIT -> SEND
//! SEND -401/403, first time-> ACQUIRE_TOKEN -> WAIT -> SEND
//! SEND -401/403, again-> WAIT -> SEND
//! SEND -other 4xx-> ABORTED (Error::Client)
//! budget exhausted -> ABORTED (Error::RetriesExhausted)
//! ```
//!
//! Token state lives inside the client. Acquisitions are serialized by a singleflight guard so
//! callers sharing one client never race a refresh.

// crates.io
use oauth2::http::{Method, Request, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenSecret, TokenState},
	config::{ClientOptions, TokenFailurePolicy},
	error::{ConfigError, TokenError, TransientError},
	http::{ApiRequest, ApiResponse, ApiTransport, body_preview},
	obs::{self, OpKind, OpOutcome, OpSpan, emit},
	retry::{self, AttemptOutcome},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

#[derive(Deserialize)]
struct TokenResponse {
	access_token: Option<String>,
}

/// Issues API calls with a bearer token, recovering from transient failures and expiry.
pub struct ApiClient<C>
where
	C: ?Sized + ApiTransport,
{
	transport: Arc<C>,
	credentials: Credentials,
	options: ClientOptions,
	token: Arc<RwLock<Option<TokenState>>>,
	token_guard: Arc<AsyncMutex<()>>,
}
impl<C> ApiClient<C>
where
	C: ?Sized + ApiTransport,
{
	/// Creates a client that sends every request through `transport`.
	pub fn with_transport(credentials: Credentials, transport: impl Into<Arc<C>>) -> Self {
		Self {
			transport: transport.into(),
			credentials,
			options: ClientOptions::default(),
			token: Arc::new(RwLock::new(None)),
			token_guard: Arc::new(AsyncMutex::new(())),
		}
	}

	/// Replaces the client options.
	pub fn with_options(mut self, options: ClientOptions) -> Self {
		self.options = options;

		self
	}

	/// Credentials used for token acquisition.
	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Options applied to every request.
	pub fn options(&self) -> &ClientOptions {
		&self.options
	}

	/// Snapshot of the current token state, if a token is held.
	pub fn token_state(&self) -> Option<TokenState> {
		self.token.read().clone()
	}

	/// Sends a `GET` request to `url`.
	pub async fn get(&self, url: Url) -> Result<ApiResponse> {
		self.request(ApiRequest::get(url)).await
	}

	/// Sends a `POST` request to `url` with `payload` as the JSON body.
	pub async fn post_json<T>(&self, url: Url, payload: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.request(ApiRequest::post(url).with_json(payload)?).await
	}

	/// Sends `request` with the bearer token, retrying within the configured budget.
	///
	/// Returns the first response below 400. Fails with [`Error::Client`] on a 4xx other than
	/// 401/403 and with [`Error::RetriesExhausted`] once every attempt has failed. A 401/403
	/// triggers at most one token acquisition per call.
	pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::ApiRequest;

		let span = OpSpan::new(KIND, "request");
		let result = span.instrument(self.run_request(&request)).await;

		match &result {
			Ok(_) => obs::record_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Acquires a fresh token unconditionally and stores it.
	///
	/// The token endpoint is called once, without retries. On failure the token is cleared,
	/// the client id and environment are logged at critical severity, and the configured
	/// [`TokenFailurePolicy`] either terminates the process or returns
	/// [`Error::TokenAcquisition`].
	pub async fn acquire_token(&self) -> Result<TokenState> {
		let _singleflight = self.token_guard.lock().await;

		self.acquire_locked().await
	}

	/// Acquires a token when none is held or the current one is stale.
	///
	/// Returns `true` when an acquisition happened.
	pub async fn refresh_if_stale(&self) -> Result<bool> {
		self.refresh_if_stale_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`ApiClient::refresh_if_stale`], evaluated at `now`.
	pub async fn refresh_if_stale_at(&self, now: OffsetDateTime) -> Result<bool> {
		if !self.is_stale_at(now) {
			return Ok(false);
		}

		let _singleflight = self.token_guard.lock().await;

		// Another caller may have refreshed while we waited.
		if !self.is_stale_at(now) {
			return Ok(false);
		}

		self.acquire_locked().await?;

		Ok(true)
	}

	fn is_stale_at(&self, now: OffsetDateTime) -> bool {
		let threshold = self.options.staleness_threshold;

		match self.token.read().as_ref() {
			Some(state) if state.is_stale_at(now, threshold) => {
				emit!(
					info,
					age_minutes = state.age_at(now).whole_minutes(),
					"Token is stale; refreshing."
				);

				true
			},
			Some(state) => {
				emit!(debug, age_minutes = state.age_at(now).whole_minutes(), "Token is fresh.");

				false
			},
			None => true,
		}
	}

	async fn run_request(&self, request: &ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::ApiRequest;

		let retry = &self.options.retry;
		let max_attempts = retry.max_attempts.max(1);
		let mut auth_refreshed = false;
		let mut attempt = 0;

		emit!(debug, method = %request.method, url = %request.url, "Sending API request.");

		self.refresh_if_stale().await?;

		loop {
			attempt += 1;

			obs::record_outcome(KIND, OpOutcome::Attempt);

			let failure = match self.send_once(request, attempt).await? {
				AttemptOutcome::Success(response) => {
					if attempt >= 2 {
						emit!(info, attempt, "Success on retry; continuing.");
					}

					return Ok(response);
				},
				AttemptOutcome::ClientError { status, body } => {
					emit!(
						error,
						method = %request.method,
						url = %request.url,
						attempt,
						status,
						"Client error: aborting API call."
					);

					return Err(Error::Client { status, body });
				},
				AttemptOutcome::AuthExpired { status } => {
					if !auth_refreshed {
						auth_refreshed = true;

						emit!(warn, status, attempt, "Authorization rejected; requesting a new token.");

						self.acquire_token().await?;
					}

					TransientError::AuthRejected { status }
				},
				AttemptOutcome::Retryable(failure) => {
					emit!(
						error,
						method = %request.method,
						url = %request.url,
						attempt,
						error = %failure,
						"API attempt failed; retrying."
					);

					failure
				},
			};

			if attempt >= max_attempts {
				emit!(
					error,
					method = %request.method,
					url = %request.url,
					attempts = attempt,
					"Retry budget exhausted."
				);

				return Err(Error::RetriesExhausted { attempts: attempt, last: failure });
			}

			obs::record_outcome(KIND, OpOutcome::Retry);

			self.refresh_if_stale().await?;

			let delay = retry.delay_after(attempt, failure.status());

			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
		}
	}

	async fn send_once(&self, request: &ApiRequest, attempt: u32) -> Result<AttemptOutcome> {
		let token = match self.token_state() {
			Some(state) => state.access_token,
			None => self.acquire_token().await?.access_token,
		};
		let http = request.to_http(&token)?;

		emit!(debug, method = %request.method, url = %request.url, attempt, "Sending attempt.");

		match self.transport.send(http, self.options.timeout).await {
			Ok(response) => {
				if response.status().as_u16() >= 400 {
					emit!(
						error,
						method = %request.method,
						url = %request.url,
						attempt,
						status = response.status().as_u16(),
						"API call returned an error status."
					);
					emit!(
						debug,
						headers = ?response.headers(),
						body = %body_preview(response.body()),
						"Error response details."
					);
				}

				Ok(retry::classify_response(response, attempt))
			},
			Err(error) => {
				let kind = self.transport.classify_error(&error);

				Ok(retry::classify_transport_error(kind, error))
			},
		}
	}

	async fn acquire_locked(&self) -> Result<TokenState> {
		const KIND: OpKind = OpKind::TokenAcquisition;

		let span = OpSpan::new(KIND, "acquire_token");

		obs::record_outcome(KIND, OpOutcome::Attempt);

		match span.instrument(self.exchange_token()).await {
			Ok(access_token) => {
				let state = TokenState::new(access_token, OffsetDateTime::now_utc());

				*self.token.write() = Some(state.clone());

				obs::record_outcome(KIND, OpOutcome::Success);
				emit!(info, "API access token acquired.");

				Ok(state)
			},
			Err(reason) => {
				*self.token.write() = None;

				obs::record_outcome(KIND, OpOutcome::Failure);

				Err(self.token_failure(reason))
			},
		}
	}

	async fn exchange_token(&self) -> Result<TokenSecret, TokenError> {
		let url = self.credentials.token_request_url();

		emit!(info, token_url = %self.credentials.token_url.url(), "Getting API access token.");

		let request = Request::builder()
			.method(Method::POST)
			.uri(url.as_str())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = self
			.transport
			.send(request, self.options.timeout)
			.await
			.map_err(|e| TokenError::Request { source: Box::new(e) })?;
		let status = response.status();

		if status.is_client_error() || status.is_server_error() {
			return Err(TokenError::Status {
				status: status.as_u16(),
				body: body_preview(response.body()),
			});
		}

		let mut de = serde_json::Deserializer::from_slice(response.body());
		let payload: TokenResponse = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| TokenError::Parse { source })?;

		payload
			.access_token
			.filter(|token| !token.is_empty())
			.map(TokenSecret::new)
			.ok_or(TokenError::MissingAccessToken)
	}

	fn token_failure(&self, reason: TokenError) -> Error {
		let client_id = self.credentials.client_id.as_str();
		let environment = self.credentials.environment;

		emit!(
			error,
			severity = "critical",
			client_id,
			production = environment.is_production(),
			environment = %environment,
			token_url = %self.credentials.token_url.url(),
			error = %reason,
			"Unable to retrieve a valid token; check the API keys and whether the production or \
			 sandbox APIs are in use."
		);

		match self.options.token_failure {
			TokenFailurePolicy::Exit(code) => std::process::exit(code),
			TokenFailurePolicy::ReturnError => Error::TokenAcquisition {
				client_id: client_id.to_owned(),
				environment,
				reason,
			},
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(credentials: Credentials) -> Self {
		Self::with_transport(credentials, ReqwestHttpClient::default())
	}
}
impl<C> Clone for ApiClient<C>
where
	C: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			credentials: self.credentials.clone(),
			options: self.options.clone(),
			token: self.token.clone(),
			token_guard: self.token_guard.clone(),
		}
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("client_id", &self.credentials.client_id.as_str())
			.field("environment", &self.credentials.environment)
			.field("options", &self.options)
			.field("token_set", &self.token.read().is_some())
			.finish()
	}
}
