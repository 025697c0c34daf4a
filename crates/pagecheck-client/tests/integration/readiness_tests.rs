use std::time::Duration;

use pagecheck_client::wait_until_ready;
use pagecheck_core::AppError;

use crate::integration::common::{spawn_fixture, unused_base_url};

#[tokio::test]
async fn ready_health_endpoint_returns_immediately() {
    let base = spawn_fixture().await;
    let url = base.join("/api/health").unwrap();

    wait_until_ready(url.as_str(), Duration::from_secs(2), Duration::from_millis(20))
        .await
        .unwrap();
}

#[tokio::test]
async fn waits_through_unavailable_responses() {
    let base = spawn_fixture().await;
    let url = base.join("/warming-health").unwrap();

    wait_until_ready(url.as_str(), Duration::from_secs(2), Duration::from_millis(20))
        .await
        .unwrap();
}

#[tokio::test]
async fn unreachable_target_times_out() {
    let base = unused_base_url().await;
    let url = base.join("/health").unwrap();

    let err = wait_until_ready(url.as_str(), Duration::from_millis(200), Duration::from_millis(20))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Timeout(_)));
}
