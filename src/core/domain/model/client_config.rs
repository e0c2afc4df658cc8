//! Client-wide configuration.

use std::time::Duration;

/// Client-side request rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sustained requests per second.
    pub requests_per_second: u32,
    /// Requests allowed in a burst before throttling kicks in.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 20,
            burst_size: 40,
        }
    }
}

/// Tunables shared by every component created from a [`crate::VirtClient`].
///
/// Every network call is bounded by one of the timeouts below; none of them
/// may be zero.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long a bearer token is trusted before re-login is required.
    pub token_lifetime: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Upper bound on a lifecycle command, after which the pending lock is released.
    pub action_timeout: Duration,
    /// Upper bound on console setup (details, negotiation and connect).
    pub console_timeout: Duration,
    /// Telemetry poll interval for a single VM.
    pub vm_poll_interval: Duration,
    /// Telemetry poll interval for the host.
    pub host_poll_interval: Duration,
    /// Optional client-side rate limiting.
    pub rate_limit: Option<RateLimitConfig>,
    /// Minimum zxcvbn score required for the login password, if any.
    pub password_min_score: Option<zxcvbn::Score>,
    /// Reject well-known reserved usernames at build time.
    pub block_reserved_usernames: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::from_secs(2 * 60 * 60),
            request_timeout: Duration::from_secs(10),
            action_timeout: Duration::from_secs(30),
            console_timeout: Duration::from_secs(15),
            vm_poll_interval: Duration::from_secs(2),
            host_poll_interval: Duration::from_secs(5),
            rate_limit: None,
            password_min_score: None,
            block_reserved_usernames: false,
        }
    }
}

impl ClientConfig {
    pub(crate) fn validate(&self) -> Result<(), crate::ValidationError> {
        let bounded = [
            ("token_lifetime", self.token_lifetime),
            ("request_timeout", self.request_timeout),
            ("action_timeout", self.action_timeout),
            ("console_timeout", self.console_timeout),
            ("vm_poll_interval", self.vm_poll_interval),
            ("host_poll_interval", self.host_poll_interval),
        ];
        for (field, value) in bounded {
            if value.is_zero() {
                return Err(crate::ValidationError::Field {
                    field: field.to_string(),
                    message: "Duration must be greater than zero".to_string(),
                });
            }
        }
        if let Some(rl) = self.rate_limit {
            if rl.requests_per_second == 0 || rl.burst_size == 0 {
                return Err(crate::ValidationError::ConstraintViolation(
                    "Rate limit values must be greater than zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}
