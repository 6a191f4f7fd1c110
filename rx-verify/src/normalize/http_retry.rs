//! HTTP retry logic with exponential backoff for drug lookup calls.
//!
//! Retries 429 rate limiting, 5xx server errors, and connect/timeout failures.
//! Any other failure is returned immediately as `LookupUnavailable`.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

/// Retry schedule for one logical request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Backoff before retry number `retry` (0-based)
    fn delay(&self, retry: u32, rate_limited: bool) -> Duration {
        // Rate limits get one extra doubling
        let exponent = if rate_limited { retry + 1 } else { retry };
        self.base_delay.saturating_mul(2u32.saturating_pow(exponent.min(16)))
    }
}

/// Send an HTTP request with retry and exponential backoff.
///
/// Retry behavior:
/// - 429 (rate limited): backoff 2x, 4x, 8x `base_delay`
/// - 5xx (server error): backoff 1x, 2x, 4x `base_delay`
/// - Timeout/connect error: backoff 1x, 2x, 4x `base_delay`
/// - Other 4xx: non-retriable, fails immediately
pub async fn send_with_retry<F>(
    client: &Client,
    build_request: F,
    policy: RetryPolicy,
    context: &str,
) -> crate::Result<Response>
where
    F: Fn(&Client) -> RequestBuilder,
{
    let attempts = policy.max_retries.saturating_add(1);
    let mut last_error = String::from("no attempt made");

    for attempt in 0..attempts {
        let is_last = attempt + 1 == attempts;
        let retry_delay = match build_request(client).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp);
                } else if status == StatusCode::TOO_MANY_REQUESTS {
                    last_error = format!("rate limited ({})", status);
                    policy.delay(attempt, true)
                } else if status.is_server_error() {
                    last_error = format!("server error ({})", status);
                    policy.delay(attempt, false)
                } else {
                    warn!(context, %status, "Non-retriable lookup response");
                    return Err(crate::Error::LookupUnavailable(format!(
                        "{}: non-retriable status {}",
                        context, status
                    )));
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_error = format!("network error ({})", e);
                policy.delay(attempt, false)
            }
            Err(e) => {
                warn!(context, error = %e, "Lookup request failed");
                return Err(crate::Error::LookupUnavailable(format!("{}: {}", context, e)));
            }
        };

        if !is_last {
            warn!(context, reason = %last_error, delay = ?retry_delay, "Retrying lookup request");
            tokio::time::sleep(retry_delay).await;
        }
    }

    warn!(context, attempts, reason = %last_error, "Lookup failed after retries");
    Err(crate::Error::LookupUnavailable(format!(
        "{}: {} after {} attempt(s)",
        context, last_error, attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(10))
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay(0, false), Duration::from_millis(100));
        assert_eq!(policy.delay(1, false), Duration::from_millis(200));
        assert_eq!(policy.delay(2, false), Duration::from_millis(400));
        assert_eq!(policy.delay(0, true), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_connection_refused_is_lookup_unavailable() {
        let client = Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();

        let result = send_with_retry(&client, |c| c.get("http://127.0.0.1:1/"), fast_policy(0), "test").await;
        assert!(matches!(result, Err(crate::Error::LookupUnavailable(_))));
    }

    #[tokio::test]
    async fn test_attempts_are_retries_plus_one() {
        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();

        let call_count = Arc::new(AtomicU32::new(0));
        let count_clone = call_count.clone();

        let result = send_with_retry(
            &client,
            |c| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                c.get("http://127.0.0.1:1/")
            },
            fast_policy(2),
            "closure-test",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_message_names_context() {
        let client = Client::new();
        let result = send_with_retry(&client, |c| c.get("http://127.0.0.1:1/"), fast_policy(0), "rxnav-test").await;
        match result {
            Err(crate::Error::LookupUnavailable(msg)) => assert!(msg.contains("rxnav-test")),
            other => panic!("Expected LookupUnavailable, got {:?}", other.map(|r| r.status())),
        }
    }
}
