//! Rate-limited HTTP client with bounded retries.

use rand::Rng;
use reqwest::{Client, Request, Response, StatusCode, Url};
use std::collections::HashMap;
use std::error::Error;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::FetchError;
use crate::limit::{RateLimitHeaders, RateLimitState, retry_after};

/// Non-standard status some exchanges use once an IP is banned for ignoring 429s.
const STATUS_IM_A_TEAPOT: u16 = 418;

/// Configuration for the rate-limited client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries after a rate-limit status or transient error.
    pub max_retries: u32,
    /// Unit of the exponential backoff (`unit * 2^retry * jitter`).
    pub backoff_unit: Duration,
    /// Fraction of the limit kept in reserve before pre-flight throttling.
    pub buffer_ratio: f64,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 5,
            backoff_unit: Duration::from_secs(1),
            buffer_ratio: 0.10,
            pool_max_idle_per_host: 4,
            user_agent: format!("tickscan/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client that throttles itself from server-reported usage.
///
/// Usage state is kept per `host + path` key. Clones share the same state.
#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    client: Client,
    config: ClientConfig,
    headers: RateLimitHeaders,
    limits: Arc<Mutex<HashMap<String, RateLimitState>>>,
}

impl RateLimitedClient {
    /// Creates a new client reading usage headers with `headers`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig, headers: RateLimitHeaders) -> Result<Self, FetchError> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            config,
            headers,
            limits: Arc::default(),
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the underlying HTTP client for building requests.
    #[must_use]
    pub const fn http(&self) -> &Client {
        &self.client
    }

    /// Returns the last recorded usage for a URL, if any.
    #[must_use]
    pub fn rate_limit_state(&self, url: &Url) -> Option<RateLimitState> {
        self.lock().get(&rate_limit_key(url)).copied()
    }

    /// Sends a request costing `weight`, throttling and retrying as needed.
    ///
    /// Before each attempt the client waits if recorded usage leaves less
    /// than the safety buffer. A 429 or 418 response waits for `Retry-After`
    /// or falls back to jittered exponential backoff; transient network
    /// errors use the same backoff. Both are capped at
    /// [`ClientConfig::max_retries`]. Any other response is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::RateLimited`] or [`FetchError::Transient`] once
    /// retries are exhausted, [`FetchError::Http`] for non-transient failures
    /// and [`FetchError::UnclonableRequest`] for streaming bodies.
    pub async fn send_with_retry(&self, request: Request, weight: u32) -> Result<Response, FetchError> {
        let key = rate_limit_key(request.url());
        let mut retries = 0;

        loop {
            let wait = self.preflight_delay(&key, weight);
            if !wait.is_zero() {
                debug!(key = %key, wait_ms = wait.as_millis(), "throttling before request");
                tokio::time::sleep(wait).await;
            }

            let attempt = request.try_clone().ok_or(FetchError::UnclonableRequest)?;
            match self.client.execute(attempt).await {
                Ok(response) => {
                    self.record_usage(&key, &response);

                    let status = response.status();
                    if !is_rate_limit_status(status) {
                        return Ok(response);
                    }
                    if retries >= self.config.max_retries {
                        return Err(FetchError::RateLimited {
                            status: status.as_u16(),
                            attempts: retries + 1,
                        });
                    }

                    let delay = retry_after(response.headers())
                        .unwrap_or_else(|| self.backoff_delay(retries, jitter()));
                    warn!(
                        key = %key,
                        status = status.as_u16(),
                        retry = retries + 1,
                        delay_ms = delay.as_millis(),
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
                Err(e) if is_transient(&e) => {
                    if retries >= self.config.max_retries {
                        return Err(FetchError::Transient {
                            attempts: retries + 1,
                            source: e,
                        });
                    }

                    let delay = self.backoff_delay(retries, jitter());
                    warn!(
                        key = %key,
                        error = %e,
                        retry = retries + 1,
                        delay_ms = delay.as_millis(),
                        "transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Returns `backoff_unit * 2^retry * jitter`.
    fn backoff_delay(&self, retry: u32, jitter: f64) -> Duration {
        let factor = f64::from(2u32.saturating_pow(retry.min(16))) * jitter;
        self.config.backoff_unit.mul_f64(factor)
    }

    /// Computes the pre-flight wait without holding the lock across the sleep.
    fn preflight_delay(&self, key: &str, weight: u32) -> Duration {
        let weight = i64::from(weight);
        self.lock()
            .get(key)
            .filter(|state| state.should_delay(weight, self.config.buffer_ratio))
            .map_or(Duration::ZERO, |state| state.delay(weight, Instant::now()))
    }

    fn record_usage(&self, key: &str, response: &Response) {
        if let Some(state) = self.headers.parse(response.headers(), Instant::now()) {
            debug!(key, used = state.used, limit = state.limit, "recorded rate-limit usage");
            self.lock().insert(key.to_string(), state);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitState>> {
        self.limits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds the rate-limit key for a URL: host followed by path.
fn rate_limit_key(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}

fn is_rate_limit_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == STATUS_IM_A_TEAPOT
}

/// Determines if an error is worth retrying.
///
/// Timeouts are retried, as are connections that were refused, reset or
/// dropped mid-exchange. Name resolution, TLS, redirect and request-building
/// failures are returned to the caller on the first attempt.
fn is_transient(error: &reqwest::Error) -> bool {
    if error.is_timeout() {
        return true;
    }
    if error.is_builder() || error.is_decode() || error.is_redirect() {
        return false;
    }
    is_transient_io(error)
}

/// Walks the source chain for an I/O error whose kind signals a dropped connection.
fn is_transient_io(error: &(dyn Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<io::Error>() {
            return matches!(
                io.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::TimedOut
            );
        }
        current = err.source();
    }
    false
}

/// Draws a jitter factor uniformly from `[0.75, 1.25)`.
fn jitter() -> f64 {
    rand::thread_rng().gen_range(0.75..1.25)
}
