//! Exponential backoff for chat-completion HTTP calls.
//!
//! 408, 429 and 5xx gateway statuses and network failures are retried.
//! Other client errors fail on the first attempt.

use anyhow::Result;
use reqwest::{Response, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// No waiting between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.backoff_factor;
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Run `operation` until it yields a 2xx response, a non-retryable status,
/// or the attempt budget runs out.
pub async fn with_retry<F, Fut>(config: &RetryConfig, service: &str, operation: F) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response>>,
{
    let attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=attempts {
        match operation().await {
            Ok(response) if response.status().is_success() => {
                if attempt > 1 {
                    tracing::info!(service, attempt, "request succeeded after retry");
                }
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if !is_retryable_status(status) {
                    anyhow::bail!("{} API error ({}): {}", service, status, body);
                }
                tracing::warn!(
                    service,
                    %status,
                    attempt,
                    max_attempts = attempts,
                    "retryable status: {}",
                    body.chars().take(200).collect::<String>()
                );
                last_error = format!("{} ({}): {}", service, status, body);
            }
            Err(e) => {
                tracing::warn!(service, attempt, max_attempts = attempts, "network error: {}", e);
                last_error = format!("{}: {}", service, e);
            }
        }

        if attempt < attempts {
            let sleep_time = delay + jitter(delay);
            tracing::debug!(service, "retrying in {:.2}s", sleep_time.as_secs_f64());
            tokio::time::sleep(sleep_time).await;
            delay = config.next_delay(delay);
        }
    }

    anyhow::bail!("all {} attempts exhausted, last error: {}", attempts, last_error)
}

/// Up to 500ms of clock-derived jitter. Zero when the base delay is zero.
fn jitter(base: Duration) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    Duration::from_millis(u64::from(nanos % 500))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn get(url: String) -> Result<Response> {
        Ok(reqwest::get(url).await?)
    }

    #[tokio::test]
    async fn test_retries_transient_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let uri = server.uri();
        let response = with_retry(&RetryConfig::immediate(3), "test", || get(uri.clone()))
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let err = with_retry(&RetryConfig::immediate(3), "test", || get(uri.clone()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let uri = server.uri();
        let err = with_retry(&RetryConfig::immediate(2), "test", || get(uri.clone()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("all 2 attempts exhausted"));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(15),
            backoff_factor: 2.0,
        };
        assert_eq!(config.next_delay(Duration::from_secs(10)), Duration::from_secs(15));
    }
}
