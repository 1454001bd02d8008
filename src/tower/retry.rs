//! Retry policy for transient failures
//!
//! Connection errors, 429 and 5xx (except 501) are retried with
//! exponential backoff. All verbs are retried unless `idempotent_only` is
//! set, so a retried POST may create a resource twice.

use reqwest::{Method, StatusCode};
use std::time::Duration;

/// Maximum retry attempts after the initial request.
pub const DEFAULT_MAX_RETRIES: u32 = 4;
/// Delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Upper bound for a single backoff sleep.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Only retry verbs that are safe to repeat.
    pub idempotent_only: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            idempotent_only: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn idempotent_only(mut self, enabled: bool) -> Self {
        self.idempotent_only = enabled;
        self
    }

    /// Whether another attempt may follow attempt number `attempt` (0-based).
    pub fn allows_retry(&self, method: &Method, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        !self.idempotent_only || is_idempotent(method)
    }

    /// Exponential backoff for a retry attempt, capped at `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(30);
        let millis = (self.base_delay.as_millis() as u64).saturating_mul(2u64.saturating_pow(exponent));
        Duration::from_millis(millis).min(self.max_delay)
    }
}

/// Status classes worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
}

/// Transport failures worth another attempt.
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::NOT_IMPLEMENTED));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(StatusCode::CONFLICT));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(10), DEFAULT_MAX_DELAY);
        assert_eq!(policy.delay(u32::MAX), DEFAULT_MAX_DELAY);
    }

    #[test]
    fn test_attempt_ceiling() {
        let policy = RetryPolicy::default().with_max_retries(2);
        assert!(policy.allows_retry(&Method::POST, 0));
        assert!(policy.allows_retry(&Method::POST, 1));
        assert!(!policy.allows_retry(&Method::POST, 2));
        assert!(!RetryPolicy::none().allows_retry(&Method::GET, 0));
    }

    #[test]
    fn test_idempotent_only_skips_post() {
        let policy = RetryPolicy::default().idempotent_only(true);
        assert!(!policy.allows_retry(&Method::POST, 0));
        assert!(policy.allows_retry(&Method::PUT, 0));
        assert!(policy.allows_retry(&Method::GET, 0));
    }
}
