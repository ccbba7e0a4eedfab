//! Client tuning knobs: timeouts, token staleness, retry budget, and fatal-token handling.

// std
use std::ops::RangeInclusive;
// self
use crate::_prelude::*;

/// Options applied by [`ApiClient`](crate::client::ApiClient) to every request.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
	/// Per-attempt timeout, also applied to the token request.
	pub timeout: StdDuration,
	/// Maximum token age before a proactive refresh.
	pub staleness_threshold: Duration,
	/// Retry budget and delays.
	pub retry: RetryPolicy,
	/// What to do when no token can be obtained.
	pub token_failure: TokenFailurePolicy,
}
impl ClientOptions {
	/// Overrides the per-attempt timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the staleness threshold; negative values clamp to zero.
	pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
		self.staleness_threshold = if threshold.is_negative() { Duration::ZERO } else { threshold };

		self
	}

	/// Overrides the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the token failure policy.
	pub fn with_token_failure(mut self, policy: TokenFailurePolicy) -> Self {
		self.token_failure = policy;

		self
	}
}
impl Default for ClientOptions {
	fn default() -> Self {
		Self {
			timeout: StdDuration::from_secs(10),
			staleness_threshold: Duration::minutes(99),
			retry: RetryPolicy::default(),
			token_failure: TokenFailurePolicy::default(),
		}
	}
}

/// Bounded retry budget with a fixed pause plus exponential status backoff.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
	/// Total attempts for one logical request, the first included.
	pub max_attempts: u32,
	/// Pause inserted after every failed attempt.
	pub fixed_delay: StdDuration,
	/// Multiplier for the exponential component.
	pub backoff_factor: f64,
	/// Upper bound of the exponential component.
	pub backoff_max: StdDuration,
	/// HTTP statuses that add the exponential component.
	pub backoff_statuses: RangeInclusive<u16>,
}
impl RetryPolicy {
	const BACKOFF_EXPONENT_CAP: u32 = 32;

	/// Policy that never sleeps between attempts.
	pub fn immediate(max_attempts: u32) -> Self {
		Self {
			max_attempts,
			fixed_delay: StdDuration::ZERO,
			backoff_factor: 0.,
			..Self::default()
		}
	}

	/// Overrides the attempt budget; zero is bumped to one.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);

		self
	}

	/// Overrides the fixed pause.
	pub fn with_fixed_delay(mut self, delay: StdDuration) -> Self {
		self.fixed_delay = delay;

		self
	}

	/// Overrides the backoff factor; negative or NaN values disable backoff.
	pub fn with_backoff_factor(mut self, factor: f64) -> Self {
		self.backoff_factor = if factor.is_finite() && factor > 0. { factor } else { 0. };

		self
	}

	/// Exponential component after `consecutive_failures` failed attempts.
	///
	/// No backoff follows the first failure; afterwards it is
	/// `factor * 2^(failures - 1)`, capped at [`RetryPolicy::backoff_max`].
	pub fn backoff(&self, consecutive_failures: u32) -> StdDuration {
		if consecutive_failures <= 1 || self.backoff_factor <= 0. {
			return StdDuration::ZERO;
		}

		let exponent = (consecutive_failures - 1).min(Self::BACKOFF_EXPONENT_CAP);
		let secs = self.backoff_factor * 2_f64.powi(exponent as i32);

		StdDuration::try_from_secs_f64(secs).unwrap_or(self.backoff_max).min(self.backoff_max)
	}

	/// Total pause after attempt `attempt` failed, given the status it saw.
	pub fn delay_after(&self, attempt: u32, status: Option<u16>) -> StdDuration {
		match status {
			Some(code) if self.backoff_statuses.contains(&code) =>
				self.fixed_delay.saturating_add(self.backoff(attempt)),
			_ => self.fixed_delay,
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 30,
			fixed_delay: StdDuration::from_secs(2),
			backoff_factor: 0.1,
			backoff_max: StdDuration::from_secs(120),
			backoff_statuses: 400..=599,
		}
	}
}

/// Reaction to an unrecoverable token acquisition failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenFailurePolicy {
	/// Log at critical severity and terminate the process with the exit code.
	Exit(i32),
	/// Log at critical severity and return [`Error::TokenAcquisition`] to the caller.
	ReturnError,
}
impl Default for TokenFailurePolicy {
	fn default() -> Self {
		Self::Exit(1)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_use_thirty_attempts_and_ten_second_timeout() {
		let options = ClientOptions::default();

		assert_eq!(options.timeout, StdDuration::from_secs(10));
		assert_eq!(options.staleness_threshold, Duration::minutes(99));
		assert_eq!(options.retry.max_attempts, 30);
		assert_eq!(options.retry.fixed_delay, StdDuration::from_secs(2));
		assert_eq!(options.token_failure, TokenFailurePolicy::Exit(1));
	}

	#[test]
	fn backoff_doubles_after_second_failure() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.backoff(1), StdDuration::ZERO);
		assert_eq!(policy.backoff(2), StdDuration::from_millis(200));
		assert_eq!(policy.backoff(3), StdDuration::from_millis(400));
		assert_eq!(policy.backoff(4), StdDuration::from_millis(800));
		assert_eq!(policy.backoff(40), StdDuration::from_secs(120));
	}

	#[test]
	fn delay_adds_backoff_only_for_http_statuses() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.delay_after(3, None), StdDuration::from_secs(2));
		assert_eq!(policy.delay_after(3, Some(503)), StdDuration::from_millis(2_400));
		assert_eq!(policy.delay_after(3, Some(302)), StdDuration::from_secs(2));
		assert_eq!(RetryPolicy::immediate(5).delay_after(9, Some(500)), StdDuration::ZERO);
	}
}
