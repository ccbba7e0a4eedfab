//! Per-attempt outcome classification feeding the request state machine.

// crates.io
use oauth2::HttpResponse;
// self
use crate::{
	_prelude::*,
	error::{BoxError, TransientError},
	http::{ApiResponse, TransportErrorKind, body_preview},
};

/// Result of one send attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
	/// Any status below 400; the request is done.
	Success(ApiResponse),
	/// Timeout, connection error, other transport failure, or 5xx.
	Retryable(TransientError),
	/// 401 or 403; the bearer token may have expired.
	AuthExpired {
		/// HTTP status code.
		status: u16,
	},
	/// Any other non-2xx status; the request is aborted.
	ClientError {
		/// HTTP status code.
		status: u16,
		/// Body preview.
		body: String,
	},
}
impl AttemptOutcome {
	/// Stable label suitable for span or metric fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			AttemptOutcome::Success(_) => "success",
			AttemptOutcome::Retryable(_) => "retryable",
			AttemptOutcome::AuthExpired { .. } => "auth_expired",
			AttemptOutcome::ClientError { .. } => "client_error",
		}
	}
}

/// Classifies an HTTP response received on attempt `attempt`.
pub fn classify_response(response: HttpResponse, attempt: u32) -> AttemptOutcome {
	let status = response.status().as_u16();

	match status {
		0..=399 => AttemptOutcome::Success(ApiResponse::from_http(response, attempt)),
		401 | 403 => AttemptOutcome::AuthExpired { status },
		500.. => AttemptOutcome::Retryable(TransientError::ServerStatus {
			status,
			body: body_preview(response.body()),
		}),
		_ => AttemptOutcome::ClientError { status, body: body_preview(response.body()) },
	}
}

/// Classifies a transport failure.
pub fn classify_transport_error<E>(kind: TransportErrorKind, error: E) -> AttemptOutcome
where
	E: 'static + Send + Sync + StdError,
{
	let source: BoxError = Box::new(error);
	let transient = match kind {
		TransportErrorKind::Timeout => TransientError::Timeout { source },
		TransportErrorKind::Connect => TransientError::Connection { source },
		TransportErrorKind::Other => TransientError::Request { source },
	};

	AttemptOutcome::Retryable(transient)
}
