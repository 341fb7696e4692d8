//! HTTP send helpers with optional retry.
//!
//! Every remote call goes through [`send`], which turns non-success
//! statuses into [`GatewayError::Upstream`] carrying the service's own
//! error message. Idempotent reads pass a [`RetryPolicy`] with retries;
//! writes pass [`RetryPolicy::SINGLE_ATTEMPT`] so a submission is never
//! duplicated.
//!
//! ```ignore
//! let response = retry::send(policy, || client.get(&url).query(&params)).await?;
//! let rows: Vec<serde_json::Value> = retry::read_json(response).await?;
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::GatewayError;

/// Maximum length of a response body kept in error messages and logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How many times to retry a transient failure, and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles on each further retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// One attempt, no retry.
    pub const SINGLE_ATTEMPT: Self = Self::new(0, Duration::ZERO);

    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor)
    }
}

/// Sends the request built by `build_request`, retrying connection errors,
/// timeouts, HTTP 429, and HTTP 5xx up to `policy.max_retries` times.
///
/// The closure is called once per attempt since builders are consumed by
/// `.send()`. Other 4xx statuses are permanent and returned immediately.
///
/// # Errors
///
/// * [`GatewayError::Network`] if the request could not be completed.
/// * [`GatewayError::Upstream`] for any non-success status left after
///   retries.
#[allow(clippy::future_not_send)]
pub async fn send<F>(
    policy: RetryPolicy,
    build_request: F,
) -> Result<reqwest::Response, GatewayError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let max_retries = policy.max_retries;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(GatewayError::Network(e));
            }
            Ok(response) => {
                let status = response.status();

                if is_retryable_status(status) && attempt < max_retries {
                    log::warn!("  HTTP {status} from {}", response.url());
                    attempt += 1;
                    continue;
                }

                if !status.is_success() {
                    return Err(upstream_error(response).await);
                }

                return Ok(response);
            }
        }
    }
}

/// Reads a successful response body as JSON.
///
/// # Errors
///
/// * [`GatewayError::Network`] if the body could not be read.
/// * [`GatewayError::Decode`] if it is not the expected JSON shape.
pub async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let url = response.url().to_string();
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        log::error!(
            "Unexpected response body from {url}: {e}\n  body preview: {}",
            preview(&text)
        );
        GatewayError::Decode {
            message: format!("{e} (received {} bytes)", text.len()),
        }
    })
}

/// Builds an [`GatewayError::Upstream`] from a failed response, pulling a
/// human-readable message out of the body when one is present.
async fn upstream_error(response: reqwest::Response) -> GatewayError {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();

    let message = extract_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
    });

    log::error!("HTTP {status} from {url}: {message}");

    GatewayError::Upstream {
        status: status.as_u16(),
        message,
    }
}

/// Looks for an error message in a response body.
///
/// JSON bodies are searched for `message`, `msg`, `error_description`, and
/// `error` (which may itself be an object with a `message`). Any other
/// non-empty body is returned as a trimmed preview.
fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            match map.get(key) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                    return Some(s.trim().to_string());
                }
                Some(serde_json::Value::Object(inner)) => {
                    if let Some(serde_json::Value::String(s)) = inner.get("message") {
                        return Some(s.trim().to_string());
                    }
                }
                _ => {}
            }
        }
        return None;
    }

    Some(preview(body))
}

fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}
