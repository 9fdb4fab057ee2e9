//! Server-reported rate-limit tracking.

use reqwest::header::HeaderMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tickscan_types::ExchangeId;

/// Binance request-weight header.
const BINANCE_USED_WEIGHT: &str = "x-mbx-used-weight-1m";
/// Binance per-minute weight limit for public market data.
const BINANCE_WEIGHT_LIMIT: i64 = 1200;

const BITGET_REMAIN: &str = "x-bitget-ratelimit-remain";
const BITGET_LIMIT: &str = "x-bitget-ratelimit-limit";
const BITGET_RESET: &str = "x-bitget-ratelimit-reset";

const GENERIC_LIMIT: &str = "x-ratelimit-limit";
const GENERIC_REMAINING: &str = "x-ratelimit-remaining";
const GENERIC_RESET: &str = "x-ratelimit-reset";

const ONE_MINUTE: Duration = Duration::from_secs(60);

/// Upper bound on any server-derived wait: reset windows, refill estimates
/// and `Retry-After`.
pub const MAX_WAIT: Duration = Duration::from_secs(300);

/// Usage snapshot for one request key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    /// Weight consumed in the current window.
    pub used: i64,
    /// Weight allowed per window.
    pub limit: i64,
    /// Length of the rate-limit window.
    pub window: Duration,
    /// When the server resets the window.
    pub reset_at: Instant,
}

impl RateLimitState {
    /// Returns the weight left after spending `weight`.
    #[must_use]
    pub const fn remaining_after(&self, weight: i64) -> i64 {
        self.limit.saturating_sub(self.used).saturating_sub(weight)
    }

    /// Returns true if spending `weight` would eat into the safety buffer.
    #[must_use]
    pub fn should_delay(&self, weight: i64, buffer_ratio: f64) -> bool {
        self.remaining_after(weight) as f64 <= self.limit as f64 * buffer_ratio
    }

    /// Estimates how long to wait before spending `weight`.
    ///
    /// Zero while the budget is not overdrawn. Otherwise the larger of the
    /// time needed to refill the shortfall at the window's average rate and
    /// the time left until the server resets, capped at [`MAX_WAIT`].
    #[must_use]
    pub fn delay(&self, weight: i64, now: Instant) -> Duration {
        let remaining = self.remaining_after(weight);
        if remaining >= 0 {
            return Duration::ZERO;
        }

        let window_secs = self.window.as_secs_f64();
        let refill = if window_secs > 0.0 && self.limit > 0 {
            let per_second = self.limit as f64 / window_secs;
            -(remaining as f64) / per_second
        } else {
            0.0
        };
        let until_reset = self.reset_at.saturating_duration_since(now).as_secs_f64();

        Duration::try_from_secs_f64(refill.max(until_reset))
            .map_or(MAX_WAIT, |wait| wait.min(MAX_WAIT))
    }
}

/// Maps provider-specific response headers onto [`RateLimitState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitHeaders {
    /// `X-MBX-USED-WEIGHT-1M` against a fixed 1200/min budget.
    Binance,
    /// `X-Bitget-Ratelimit-{Remain,Limit,Reset}`, reset in seconds.
    Bitget,
    /// `X-RateLimit-{Limit,Remaining,Reset}`, reset as a Unix timestamp.
    Generic,
}

impl RateLimitHeaders {
    /// Returns the header convention used by an exchange.
    #[must_use]
    pub const fn for_exchange(exchange: ExchangeId) -> Self {
        match exchange {
            ExchangeId::Binance => Self::Binance,
            ExchangeId::Bitget => Self::Bitget,
            ExchangeId::Bybit | ExchangeId::Okx => Self::Generic,
        }
    }

    /// Parses usage headers, returning `None` if they are absent or malformed.
    #[must_use]
    pub fn parse(&self, headers: &HeaderMap, now: Instant) -> Option<RateLimitState> {
        match self {
            Self::Binance => {
                let used = header_i64(headers, BINANCE_USED_WEIGHT)?;
                Some(RateLimitState {
                    used,
                    limit: BINANCE_WEIGHT_LIMIT,
                    window: ONE_MINUTE,
                    reset_at: now + ONE_MINUTE,
                })
            }
            Self::Bitget => {
                let remain = header_i64(headers, BITGET_REMAIN)?;
                let limit = header_i64(headers, BITGET_LIMIT)?;
                let reset_secs = header_i64(headers, BITGET_RESET)?;
                Some(RateLimitState {
                    used: limit.saturating_sub(remain),
                    limit,
                    window: ONE_MINUTE,
                    reset_at: now.checked_add(secs(reset_secs))?,
                })
            }
            Self::Generic => {
                let limit = header_i64(headers, GENERIC_LIMIT)?;
                let remaining = header_i64(headers, GENERIC_REMAINING)?;
                let reset_unix = header_i64(headers, GENERIC_RESET)?;
                let until_reset = secs(reset_unix.saturating_sub(unix_now()));
                Some(RateLimitState {
                    used: limit.saturating_sub(remaining),
                    limit,
                    window: until_reset,
                    reset_at: now.checked_add(until_reset)?,
                })
            }
        }
    }
}

/// Parses `Retry-After` as whole seconds, capped at [`MAX_WAIT`].
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds = header_i64(headers, reqwest::header::RETRY_AFTER.as_str())?;
    u64::try_from(seconds)
        .ok()
        .map(|s| Duration::from_secs(s).min(MAX_WAIT))
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Converts a header second count, clamping negatives to zero and the rest to [`MAX_WAIT`].
fn secs(value: i64) -> Duration {
    Duration::from_secs(u64::try_from(value).unwrap_or(0)).min(MAX_WAIT)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_static(*name),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    fn make_state(used: i64, limit: i64, window_secs: u64, reset_in_secs: u64) -> (RateLimitState, Instant) {
        let now = Instant::now();
        let state = RateLimitState {
            used,
            limit,
            window: Duration::from_secs(window_secs),
            reset_at: now + Duration::from_secs(reset_in_secs),
        };
        (state, now)
    }

    #[test]
    fn test_should_delay_inside_buffer() {
        let (state, _) = make_state(1000, 1200, 60, 60);
        assert!(!state.should_delay(1, 0.10));

        let (state, _) = make_state(1079, 1200, 60, 60);
        assert!(state.should_delay(1, 0.10));
    }

    #[test]
    fn test_delay_zero_when_not_overdrawn() {
        let (state, now) = make_state(1150, 1200, 60, 60);
        assert!(state.should_delay(1, 0.10));
        assert_eq!(state.delay(1, now), Duration::ZERO);
    }

    #[test]
    fn test_delay_prefers_reset_when_longer() {
        let (state, now) = make_state(1250, 1200, 60, 30);
        // Refill estimate: 51 / (1200 / 60) = 2.55s; reset is 30s away.
        let delay = state.delay(1, now);
        assert_eq!(delay, Duration::from_secs(30));
    }

    #[test]
    fn test_delay_prefers_refill_when_longer() {
        let (state, now) = make_state(20, 10, 10, 1);
        // Refill estimate: 11 / (10 / 10) = 11s.
        let delay = state.delay(1, now);
        assert_eq!(delay, Duration::from_secs(11));
    }

    #[test]
    fn test_binance_headers() {
        let now = Instant::now();
        let parsed = RateLimitHeaders::Binance
            .parse(&headers(&[("x-mbx-used-weight-1m", "42")]), now)
            .unwrap();
        assert_eq!(parsed.used, 42);
        assert_eq!(parsed.limit, 1200);
        assert_eq!(parsed.window, ONE_MINUTE);
        assert_eq!(parsed.reset_at, now + ONE_MINUTE);
    }

    #[test]
    fn test_bitget_headers() {
        let now = Instant::now();
        let parsed = RateLimitHeaders::Bitget
            .parse(
                &headers(&[
                    ("x-bitget-ratelimit-remain", "15"),
                    ("x-bitget-ratelimit-limit", "20"),
                    ("x-bitget-ratelimit-reset", "2"),
                ]),
                now,
            )
            .unwrap();
        assert_eq!(parsed.used, 5);
        assert_eq!(parsed.limit, 20);
        assert_eq!(parsed.reset_at, now + Duration::from_secs(2));
    }

    #[test]
    fn test_generic_headers() {
        let now = Instant::now();
        let reset = (unix_now() + 30).to_string();
        let parsed = RateLimitHeaders::Generic
            .parse(
                &headers(&[
                    ("x-ratelimit-limit", "120"),
                    ("x-ratelimit-remaining", "100"),
                    ("x-ratelimit-reset", &reset),
                ]),
                now,
            )
            .unwrap();
        assert_eq!(parsed.used, 20);
        assert_eq!(parsed.limit, 120);
        assert!(parsed.window <= Duration::from_secs(30));
        assert!(parsed.window >= Duration::from_secs(29));
    }

    #[test]
    fn test_incomplete_headers_ignored() {
        let now = Instant::now();
        let partial = headers(&[("x-ratelimit-limit", "120")]);
        assert!(RateLimitHeaders::Generic.parse(&partial, now).is_none());

        let garbage = headers(&[("x-mbx-used-weight-1m", "lots")]);
        assert!(RateLimitHeaders::Binance.parse(&garbage, now).is_none());
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(
            retry_after(&headers(&[("retry-after", "3")])),
            Some(Duration::from_secs(3))
        );
        assert_eq!(retry_after(&headers(&[("retry-after", "soon")])), None);
        assert_eq!(retry_after(&headers(&[("retry-after", "-1")])), None);
        assert_eq!(retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn test_extreme_reset_headers_are_clamped() {
        let now = Instant::now();
        let bitget = RateLimitHeaders::Bitget
            .parse(
                &headers(&[
                    ("x-bitget-ratelimit-remain", "0"),
                    ("x-bitget-ratelimit-limit", "20"),
                    ("x-bitget-ratelimit-reset", "9223372036854775807"),
                ]),
                now,
            )
            .unwrap();
        assert_eq!(bitget.reset_at, now + MAX_WAIT);
        assert_eq!(bitget.delay(1, now), MAX_WAIT);

        let generic = RateLimitHeaders::Generic
            .parse(
                &headers(&[
                    ("x-ratelimit-limit", "9223372036854775807"),
                    ("x-ratelimit-remaining", "-9223372036854775808"),
                    ("x-ratelimit-reset", "-9223372036854775808"),
                ]),
                now,
            )
            .unwrap();
        assert_eq!(generic.used, i64::MAX);
        assert_eq!(generic.window, Duration::ZERO);
        assert_eq!(generic.reset_at, now);
        assert!(generic.delay(1, now) <= MAX_WAIT);

        let far_future = RateLimitHeaders::Generic
            .parse(
                &headers(&[
                    ("x-ratelimit-limit", "10"),
                    ("x-ratelimit-remaining", "0"),
                    ("x-ratelimit-reset", "9223372036854775807"),
                ]),
                now,
            )
            .unwrap();
        assert_eq!(far_future.window, MAX_WAIT);
        assert_eq!(far_future.delay(1, now), MAX_WAIT);
    }

    #[test]
    fn test_delay_capped_for_huge_shortfall() {
        let (state, now) = make_state(i64::MAX, 1, 60, 0);
        assert_eq!(state.remaining_after(1), i64::MIN + 1);
        assert_eq!(state.delay(i64::MAX, now), MAX_WAIT);
    }

    #[test]
    fn test_retry_after_capped() {
        assert_eq!(
            retry_after(&headers(&[("retry-after", "9223372036854775807")])),
            Some(MAX_WAIT)
        );
    }

    #[test]
    fn test_for_exchange() {
        assert_eq!(RateLimitHeaders::for_exchange(ExchangeId::Binance), RateLimitHeaders::Binance);
        assert_eq!(RateLimitHeaders::for_exchange(ExchangeId::Bitget), RateLimitHeaders::Bitget);
        assert_eq!(RateLimitHeaders::for_exchange(ExchangeId::Okx), RateLimitHeaders::Generic);
    }
}
