//! Transport primitives for authenticated API calls.
//!
//! The module exposes [`ApiTransport`], the client's only dependency on an HTTP stack,
//! together with the [`ApiRequest`] description callers hand to
//! [`ApiClient::request`](crate::client::ApiClient::request) and the [`ApiResponse`] it
//! returns. Transports report failures through [`ApiTransport::classify_error`] so the retry
//! loop can tell timeouts and connection drops apart from other request errors without
//! knowing the concrete client.

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		HeaderMap, HeaderName, HeaderValue, Method, Request,
		header::{AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

const BODY_PREVIEW_LIMIT: usize = 512;

/// Coarse classification of a transport failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
	/// The attempt exceeded its timeout.
	Timeout,
	/// The connection could not be established or was dropped.
	Connect,
	/// Anything else raised before a response arrived.
	Other,
}

/// Abstraction over HTTP transports used for token and API calls.
///
/// Implementations must be `Send + Sync + 'static` so a client can be shared behind an
/// [`Arc`]. Non-2xx statuses are not errors at this layer: `send` returns the response and
/// the client classifies it.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request`, giving up after `timeout`.
	fn send(
		&self,
		request: HttpRequest,
		timeout: StdDuration,
	) -> TransportFuture<'_, Self::TransportError>;

	/// Classifies a transport failure for the retry loop.
	fn classify_error(&self, error: &Self::TransportError) -> TransportErrorKind;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The default client verifies TLS certificates through rustls.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn send(&self, request: HttpRequest, timeout: StdDuration) -> TransportFuture<'_, ReqwestError> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut request = reqwest::Request::try_from(request)?;

			*request.timeout_mut() = Some(timeout);

			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}

	fn classify_error(&self, error: &ReqwestError) -> TransportErrorKind {
		if error.is_timeout() {
			TransportErrorKind::Timeout
		} else if error.is_connect() {
			TransportErrorKind::Connect
		} else {
			TransportErrorKind::Other
		}
	}
}

/// Outbound API call described independently of any transport.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL, query included.
	pub url: Url,
	/// Caller headers; `Authorization` is always replaced by the bearer token.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Appends query parameters to the URL.
	pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		self.url.query_pairs_mut().extend_pairs(pairs);

		self
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `payload` as the JSON body and sets the content type.
	pub fn with_json<T>(mut self, payload: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(payload).map_err(ConfigError::BodySerialize)?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = Some(body);

		Ok(self)
	}

	/// Builds the wire request carrying `token` as a bearer credential.
	pub(crate) fn to_http(&self, token: &TokenSecret) -> Result<HttpRequest, ConfigError> {
		let mut request = Request::builder()
			.method(self.method.clone())
			.uri(self.url.as_str())
			.body(self.body.clone().unwrap_or_default())?;
		let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
			.map_err(|_| ConfigError::InvalidHeader { name: "authorization" })?;

		bearer.set_sensitive(true);

		let headers = request.headers_mut();

		headers.extend(self.headers.clone());
		headers.insert(AUTHORIZATION, bearer);

		Ok(request)
	}
}

/// Successful API response handed back to the caller.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
	/// Attempts spent on the logical request, the successful one included.
	pub attempts: u32,
}
impl ApiResponse {
	pub(crate) fn from_http(response: HttpResponse, attempts: u32) -> Self {
		let status = response.status().as_u16();
		let (parts, body) = response.into_parts();

		Self { status, headers: parts.headers, body, attempts }
	}

	/// Decodes the body as JSON into `T`, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de).map_err(|source| Error::ResponseParse { source })
	}

	/// Decodes the body as an untyped JSON value.
	pub fn value(&self) -> Result<serde_json::Value> {
		self.json()
	}

	/// Returns the body as text, replacing invalid UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Truncated, lossy body text for logs and error payloads.
pub(crate) fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut buf: String = text.chars().take(BODY_PREVIEW_LIMIT).collect();

	buf.push('…');

	buf
}
