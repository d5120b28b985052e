use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use http::{HeaderValue, StatusCode};
use tracing::{debug, warn};

use crate::backoff::BackoffStrategy;
use crate::config::ClientConfiguration;
use crate::error::TransportError;
use crate::execution::RequestExecutor;
use crate::headers::{Headers, OKTA_RETRY_COUNT, OKTA_RETRY_FOR, RATE_LIMIT_RESET};
use crate::request::Request;
use crate::response::Response;

/// Ceiling on the default exponential schedule.
const DEFAULT_MAX_BACKOFF_MILLIS: u64 = 20 * 1000;
const BACKOFF_SCALE_FACTOR_MILLIS: u64 = 300;
/// Slack added on top of a rate-limit reset to avoid racing it.
const RATE_LIMIT_RESET_SLACK_MILLIS: i64 = 1000;

const RETRYABLE_STATUSES: [StatusCode; 3] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Request executor that drives an inner executor through a bounded retry
/// loop.
///
/// Attempts are bounded by a total attempt cap, a wall-clock budget, or
/// both; with both disabled the first attempt runs and nothing is retried.
/// Between attempts the caller's headers and query string are restored from
/// snapshots taken on entry, a rewindable body is rewound, and the retry
/// correlation headers are written so the server can tie the attempts
/// together.
///
/// The executor is thread-safe: all per-call state lives on the stack of a
/// single `execute` invocation.
pub struct RetryRequestExecutor<E> {
    delegate: E,
    max_attempts: u32,
    max_elapsed_millis: u64,
    backoff_strategy: Option<Arc<dyn BackoffStrategy>>,
    cancel: CancelToken,
}

impl<E> RetryRequestExecutor<E> {
    pub fn new(configuration: &ClientConfiguration, delegate: E) -> Self {
        Self {
            delegate,
            max_attempts: configuration.retry_max_attempts,
            max_elapsed_millis: configuration.retry_max_elapsed_secs.saturating_mul(1000),
            backoff_strategy: None,
            cancel: CancelToken::new(),
        }
    }

    /// Replaces the computed pause entirely: a configured strategy takes
    /// precedence over the rate-limit reset path as well as the default
    /// schedule.
    pub fn with_backoff_strategy(mut self, backoff_strategy: Arc<dyn BackoffStrategy>) -> Self {
        self.backoff_strategy = Some(backoff_strategy);
        self
    }

    /// Token that aborts an in-progress or future backoff pause. Cancelling
    /// makes the call surface a non-retryable error; the token stays
    /// cancelled afterwards.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether a retry executing `attempt` may proceed, `time_elapsed`
    /// milliseconds into the call. The comparison is `<=` on the attempt cap
    /// and `<` on the elapsed cap.
    fn within_budget(&self, attempt: u32, time_elapsed: u64) -> bool {
        (self.max_attempts > 0 || self.max_elapsed_millis > 0)
            && (self.max_attempts == 0 || attempt <= self.max_attempts)
            && (self.max_elapsed_millis == 0 || time_elapsed < self.max_elapsed_millis)
    }

    fn should_retry_response(&self, response: &Response, retry_count: u32, time_elapsed: u64) -> bool {
        self.within_budget(retry_count + 1, time_elapsed)
            && RETRYABLE_STATUSES.contains(&response.status())
    }

    fn should_retry_error(&self, error: &TransportError, retry_count: u32, time_elapsed: u64) -> bool {
        if !self.within_budget(retry_count + 1, time_elapsed) {
            return false;
        }
        if error.kind().is_socket_level() {
            debug!(kind = %error.kind(), "retrying after transport failure: {error}");
            return true;
        }
        false
    }

    /// Sleeps before the next attempt. `retries` is the number of attempts
    /// already executed.
    fn pause_before_retry(
        &self,
        retries: u32,
        response: Option<&Response>,
        time_elapsed: u64,
    ) -> Result<(), PauseFailure> {
        if !self.within_budget(retries + 1, time_elapsed) {
            return Err(PauseFailure::Budget(failed_to_retry()));
        }

        let time_left = if self.max_elapsed_millis == 0 {
            u64::MAX
        } else {
            self.max_elapsed_millis - time_elapsed
        };

        let rate_limited = response.filter(|prior| prior.status() == StatusCode::TOO_MANY_REQUESTS);
        let delay = if let Some(backoff_strategy) = &self.backoff_strategy {
            backoff_strategy.delay_millis(retries).min(time_left)
        } else if let Some(delay) = rate_limited.and_then(rate_limit_reset_delay_millis) {
            if !self.within_budget(retries + 1, time_elapsed.saturating_add(delay)) {
                return Err(PauseFailure::Budget(failed_to_retry()));
            }
            debug!(delay_millis = delay, attempt = retries, "429 detected, honoring rate limit reset");
            delay
        } else {
            default_delay_millis(retries).min(time_left)
        };

        debug!(delay_millis = delay, attempt = retries, "retryable condition detected, pausing before retry");
        if !self.cancel.sleep(Duration::from_millis(delay)) {
            return Err(PauseFailure::Cancelled(TransportError::other(
                "retry backoff interrupted by cancellation",
            )));
        }
        Ok(())
    }
}

impl<E: RequestExecutor> RequestExecutor for RetryRequestExecutor<E> {
    fn execute(&self, request: &mut Request) -> Result<Response, TransportError> {
        // Snapshot the caller's query params and headers so every retry can
        // start over from the originals.
        let original_query = request.query().clone();
        let original_headers = request.headers().clone();

        let timer = Timer::new();
        let mut retry_count: u32 = 0;
        let mut response: Option<Response> = None;
        let mut request_id: Option<HeaderValue> = None;

        loop {
            if retry_count > 0 {
                request.set_query(original_query.clone());
                request.set_headers(original_headers.clone());

                // remember the correlation ID of the first observed response
                if request_id.is_none() {
                    request_id = remembered_request_id(response.as_ref());
                }

                if let Some(body) = request.body_mut()
                    && body.is_rewindable()
                {
                    body.rewind();
                }

                if let Err(failure) =
                    self.pause_before_retry(retry_count, response.as_ref(), timer.split_millis())
                {
                    return match failure {
                        PauseFailure::Budget(error) => {
                            warn!("unable to pause for retry: {error}");
                            match response.take() {
                                Some(response) => Ok(response),
                                None => Err(error),
                            }
                        }
                        PauseFailure::Cancelled(error) => Err(error),
                    };
                }
            }

            retry_count += 1;
            set_retry_headers(request, request_id.as_ref(), retry_count);

            match self.delegate.execute(request) {
                Ok(attempt_response) => {
                    if !self.should_retry_response(&attempt_response, retry_count, timer.split_millis())
                    {
                        return Ok(attempt_response);
                    }
                    response = Some(attempt_response);
                }
                Err(error) => {
                    warn!("unable to execute HTTP request: {error}");
                    if !self.should_retry_error(&error, retry_count, timer.split_millis()) {
                        return Err(TransportError::wrapped(error));
                    }
                }
            }
        }
    }
}

enum PauseFailure {
    Budget(TransportError),
    Cancelled(TransportError),
}

fn failed_to_retry() -> TransportError {
    TransportError::other("cannot retry request, next request will exceed retry configuration")
}

/// Default exponential schedule: `2^retries * 300`ms, capped at 20s.
fn default_delay_millis(retries: u32) -> u64 {
    (BACKOFF_SCALE_FACTOR_MILLIS << retries.min(31)).min(DEFAULT_MAX_BACKOFF_MILLIS)
}

/// Delay dictated by a 429 response: the distance from the server's `Date`
/// to `X-Rate-Limit-Reset`, plus a second of slack. `None` when either
/// header is missing, repeated, or unparseable, or when the computed delay
/// is negative (server clock ahead of the reset) -- callers then fall back
/// to the default schedule.
fn rate_limit_reset_delay_millis(response: &Response) -> Option<u64> {
    let reset = only_single_header_value(response.headers(), RATE_LIMIT_RESET)?;
    if reset.is_empty() || !reset.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let date_millis = response.headers().date_millis()?;
    let reset_millis = reset.parse::<i64>().ok()?.checked_mul(1000)?;
    let delay = reset_millis - date_millis + RATE_LIMIT_RESET_SLACK_MILLIS;
    debug!("429 wait: {reset_millis} - {date_millis} + {RATE_LIMIT_RESET_SLACK_MILLIS} = {delay}");
    u64::try_from(delay).ok()
}

fn only_single_header_value<'h>(
    headers: &'h Headers,
    name: http::header::HeaderName,
) -> Option<&'h str> {
    let values = headers.get_all(name);
    match values.as_slice() {
        [value] => Some(value),
        _ => None,
    }
}

fn remembered_request_id(response: Option<&Response>) -> Option<HeaderValue> {
    response?.headers().request_id_value().cloned()
}

fn set_retry_headers(request: &mut Request, request_id: Option<&HeaderValue>, retry_count: u32) {
    if let Some(request_id) = request_id
        && !request_id.is_empty()
    {
        request.headers_mut().set(OKTA_RETRY_FOR, request_id.clone());
    }
    if retry_count > 1 {
        request
            .headers_mut()
            .set(OKTA_RETRY_COUNT, HeaderValue::from(retry_count));
    }
}

/// Monotonic elapsed-time source anchored at the start of one `execute`.
struct Timer {
    started_at: Instant,
}

impl Timer {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    fn split_millis(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Cancels the backoff pause from another thread.
///
/// Cancellation is sticky: once cancelled, every current and future pause on
/// executors sharing the token fails immediately.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = lock_unpoisoned(&self.inner.cancelled);
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *lock_unpoisoned(&self.inner.cancelled)
    }

    /// Sleeps for `delay`, waking early on cancellation. Returns `true` when
    /// the full delay elapsed, `false` when the token was cancelled.
    pub(crate) fn sleep(&self, delay: Duration) -> bool {
        let mut cancelled = lock_unpoisoned(&self.inner.cancelled);
        let mut remaining = delay;
        loop {
            if *cancelled {
                return false;
            }
            if remaining.is_zero() {
                return true;
            }
            let wait_started_at = Instant::now();
            let (guard, wait_result) =
                match self.inner.condvar.wait_timeout(cancelled, remaining) {
                    Ok(woken) => woken,
                    Err(poisoned) => poisoned.into_inner(),
                };
            cancelled = guard;
            if *cancelled {
                return false;
            }
            if wait_result.timed_out() {
                return true;
            }
            remaining = remaining.saturating_sub(wait_started_at.elapsed());
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::header::{DATE, HeaderValue};

    use super::*;

    struct NeverExecutor;

    impl RequestExecutor for NeverExecutor {
        fn execute(&self, _request: &mut Request) -> Result<Response, TransportError> {
            Err(TransportError::other("not reachable in these tests"))
        }
    }

    fn executor(max_attempts: u32, max_elapsed_secs: u64) -> RetryRequestExecutor<NeverExecutor> {
        let configuration = ClientConfiguration {
            retry_max_attempts: max_attempts,
            retry_max_elapsed_secs: max_elapsed_secs,
            ..ClientConfiguration::default()
        };
        RetryRequestExecutor::new(&configuration, NeverExecutor)
    }

    fn rate_limited_response(reset: &str, date: Option<&str>) -> Response {
        let mut headers = Headers::new();
        headers.set(
            RATE_LIMIT_RESET,
            HeaderValue::from_str(reset).expect("reset header value"),
        );
        if let Some(date) = date {
            headers.set(DATE, HeaderValue::from_str(date).expect("date header value"));
        }
        Response::new(StatusCode::TOO_MANY_REQUESTS, headers, Bytes::new(), 0)
    }

    #[test]
    fn default_schedule_doubles_and_caps() {
        assert_eq!(default_delay_millis(1), 600);
        assert_eq!(default_delay_millis(2), 1200);
        assert_eq!(default_delay_millis(3), 2400);
        assert_eq!(default_delay_millis(6), 19_200);
        assert_eq!(default_delay_millis(7), 20_000);
        assert_eq!(default_delay_millis(60), 20_000);
    }

    #[test]
    fn budget_comparisons_are_asymmetric() {
        let bounded = executor(2, 1);
        assert!(bounded.within_budget(2, 999));
        assert!(!bounded.within_budget(3, 0));
        assert!(!bounded.within_budget(2, 1000));
    }

    #[test]
    fn budget_with_both_caps_disabled_denies_every_retry() {
        let unbounded = executor(0, 0);
        assert!(!unbounded.within_budget(1, 0));
    }

    #[test]
    fn budget_with_only_elapsed_cap_ignores_attempts() {
        let elapsed_only = executor(0, 1);
        assert!(elapsed_only.within_budget(500, 999));
        assert!(!elapsed_only.within_budget(1, 1000));
    }

    #[test]
    fn rate_limit_delay_spans_date_to_reset_plus_slack() {
        // Date = 784_111_777s epoch, reset three seconds later.
        let response =
            rate_limited_response("784111780", Some("Sun, 06 Nov 1994 08:49:37 GMT"));
        assert_eq!(rate_limit_reset_delay_millis(&response), Some(4000));
    }

    #[test]
    fn rate_limit_delay_requires_a_numeric_reset() {
        let response = rate_limited_response("soon", Some("Sun, 06 Nov 1994 08:49:37 GMT"));
        assert_eq!(rate_limit_reset_delay_millis(&response), None);
    }

    #[test]
    fn rate_limit_delay_requires_a_date_header() {
        let response = rate_limited_response("784111780", None);
        assert_eq!(rate_limit_reset_delay_millis(&response), None);
    }

    #[test]
    fn rate_limit_delay_requires_a_single_reset_value() {
        let first = rate_limited_response("784111780", Some("Sun, 06 Nov 1994 08:49:37 GMT"));
        let mut headers = first.headers().clone();
        headers.add(RATE_LIMIT_RESET, HeaderValue::from_static("784111781"));
        let response = Response::new(StatusCode::TOO_MANY_REQUESTS, headers, Bytes::new(), 0);
        assert_eq!(rate_limit_reset_delay_millis(&response), None);
    }

    #[test]
    fn rate_limit_delay_in_the_past_falls_back() {
        // Reset four seconds before the server's own Date header.
        let response =
            rate_limited_response("784111773", Some("Sun, 06 Nov 1994 08:49:37 GMT"));
        assert_eq!(rate_limit_reset_delay_millis(&response), None);
    }

    #[test]
    fn cancelled_token_aborts_the_sleep() {
        let token = CancelToken::new();
        token.cancel();
        let started_at = Instant::now();
        assert!(!token.sleep(Duration::from_secs(30)));
        assert!(started_at.elapsed() < Duration::from_secs(1));
        assert!(token.is_cancelled());
    }

    #[test]
    fn sleep_completes_without_cancellation() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(10)));
    }

    #[test]
    fn cancel_wakes_a_sleeping_thread() {
        let token = CancelToken::new();
        let sleeper = token.clone();
        let handle = std::thread::spawn(move || sleeper.sleep(Duration::from_secs(30)));
        std::thread::sleep(Duration::from_millis(50));
        token.cancel();
        assert!(!handle.join().expect("sleeper thread should finish"));
    }
}
