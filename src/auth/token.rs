//! Bearer token secret and issuance state.

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Current bearer token and the instant it was issued.
///
/// Replaced wholesale on every acquisition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenState {
	/// Bearer token sent in the `Authorization` header.
	pub access_token: TokenSecret,
	/// Instant the token was obtained.
	pub issued_at: OffsetDateTime,
}
impl TokenState {
	/// Creates state for a token issued at `issued_at`.
	pub fn new(access_token: TokenSecret, issued_at: OffsetDateTime) -> Self {
		Self { access_token, issued_at }
	}

	/// Elapsed time since issuance at the provided instant.
	pub fn age_at(&self, now: OffsetDateTime) -> Duration {
		now - self.issued_at
	}

	/// Returns `true` once the whole elapsed seconds exceed `threshold`.
	pub fn is_stale_at(&self, now: OffsetDateTime, threshold: Duration) -> bool {
		self.age_at(now).whole_seconds() > threshold.whole_seconds()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn staleness_uses_whole_seconds_past_threshold() {
		let issued_at = datetime!(2024-03-01 08:00:00 UTC);
		let state = TokenState::new(TokenSecret::new("token"), issued_at);
		let threshold = Duration::minutes(99);

		assert!(!state.is_stale_at(issued_at, threshold));
		assert!(!state.is_stale_at(issued_at + Duration::minutes(99), threshold));
		assert!(!state.is_stale_at(issued_at + Duration::milliseconds(99 * 60_000 + 500), threshold));
		assert!(state.is_stale_at(issued_at + Duration::seconds(99 * 60 + 1), threshold));
		assert!(state.is_stale_at(issued_at + Duration::minutes(100), threshold));
	}
}
