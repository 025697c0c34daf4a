use std::time::Duration;

use pagecheck_core::error::AppError;
use reqwest::Client;
use tokio::time::Instant;

/// Poll `url` until it answers with a 2xx status.
///
/// Used to wait for the system under test (typically its `/health` or
/// `/api/health` endpoint) before any scenario starts. Fails with
/// [`AppError::Timeout`] if no successful response arrives in time.
pub async fn wait_until_ready(
    url: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), AppError> {
    let client = Client::builder()
        .user_agent(concat!("pagecheck/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::HttpError(e.to_string()))?;

    let deadline = Instant::now() + timeout;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());

        match tokio::time::timeout(remaining.max(interval), client.get(url).send()).await {
            Ok(Ok(response)) if response.status().is_success() => {
                tracing::info!(%url, %attempt, "Target is ready");
                return Ok(());
            }
            Ok(Ok(response)) => {
                tracing::debug!(%url, status = %response.status(), %attempt, "Target not ready");
            }
            Ok(Err(e)) => {
                tracing::debug!(%url, error = %e, %attempt, "Target not reachable yet");
            }
            Err(_) => {
                tracing::debug!(%url, %attempt, "Readiness check timed out");
            }
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(%url, %attempt, "Target never became ready");
            return Err(AppError::Timeout(timeout.as_secs()));
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
