//! Back-off policy for 429 Too Many Requests.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Retries after the first rate-limited attempt (four attempts in total)
pub const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Sleep used when `Retry-After` is absent or unparseable
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(2);

const MIN_RETRY_AFTER: Duration = Duration::from_secs(1);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub default_delay: Duration,
    pub min_delay: Duration,
    /// Upper bound on any single sleep, whatever the server asks for
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RATE_LIMIT_RETRIES,
            default_delay: DEFAULT_RETRY_AFTER,
            min_delay: MIN_RETRY_AFTER,
            max_delay: MAX_RETRY_AFTER,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// How long to sleep given the `Retry-After` header of a 429 response.
    ///
    /// Accepts delta-seconds (fractional values tolerated) or an HTTP-date.
    pub fn delay_for(&self, retry_after: Option<&str>) -> Duration {
        let requested = retry_after
            .and_then(|value| parse_retry_after(value, Utc::now()))
            .unwrap_or(self.default_delay);
        requested.max(self.min_delay).min(self.max_delay)
    }
}

fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        return (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
