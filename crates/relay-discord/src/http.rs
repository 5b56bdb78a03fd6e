use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::time::sleep;

use relay_core::{errors::Error, Result};

const MAX_RETRIES: usize = 1;
const MAX_RETRY_WAIT: Duration = Duration::from_secs(10);
const ERROR_BODY_CHARS: usize = 200;

/// Send the request built by `build`, retrying once on HTTP 429.
///
/// `build` is called per attempt since a `RequestBuilder` is consumed by `send`.
pub(crate) async fn execute(
    what: &str,
    mut build: impl FnMut() -> RequestBuilder,
) -> Result<Response> {
    let mut attempts = 0usize;
    loop {
        let resp = build()
            .send()
            .await
            .map_err(|e| Error::External(format!("{what}: request error: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let header_wait = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<f64>().ok());
        let body = resp.text().await.unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS && attempts < MAX_RETRIES {
            attempts += 1;
            let wait = retry_after(&body, header_wait);
            tracing::warn!(what, wait_ms = wait.as_millis() as u64, "rate limited, retrying");
            sleep(wait).await;
            continue;
        }

        return Err(Error::Transport {
            status: status.as_u16(),
            message: format!("{what}: {}", truncate(&body, ERROR_BODY_CHARS)),
        });
    }
}

/// Wait from Discord's JSON `retry_after` (seconds), else the header, capped.
pub(crate) fn retry_after(body: &str, header_secs: Option<f64>) -> Duration {
    let from_body = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("retry_after").and_then(|r| r.as_f64()));

    let secs = from_body
        .or(header_secs)
        .filter(|s| s.is_finite() && *s >= 0.0)
        .unwrap_or(1.0);
    // Clamp before converting; huge values would not fit a Duration.
    Duration::from_secs_f64(secs.min(MAX_RETRY_WAIT.as_secs_f64()))
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
