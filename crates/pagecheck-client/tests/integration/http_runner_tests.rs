use std::time::Duration;

use pagecheck_client::HttpBrowser;
use pagecheck_core::config::PollConfig;
use pagecheck_core::models::{Assertion, FailureKind, Scenario};
use pagecheck_core::scenarios::builtin_scenarios;
use pagecheck_core::traits::{Browser, BrowsingContext};
use pagecheck_core::{RunConfig, SmokeRunner};

use crate::integration::common::{spawn_fixture, unused_base_url};

fn runner() -> SmokeRunner<HttpBrowser> {
    let config = RunConfig::default()
        .with_navigation_timeout(Duration::from_secs(5))
        .with_assertion_timeout(Duration::from_millis(500))
        .with_poll(PollConfig {
            interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(50),
        });
    SmokeRunner::new(HttpBrowser::with_timeout(Duration::from_secs(5)).unwrap(), config)
}

#[tokio::test]
async fn builtin_scenarios_pass_against_healthy_frontend() {
    let base = spawn_fixture().await;

    let results = runner().run(&base, &builtin_scenarios()).await;

    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(result.passed, "{}: {:?}", result.scenario_name, result.failures);
    }
}

#[tokio::test]
async fn broken_frontend_reports_every_failed_assertion() {
    let base = spawn_fixture().await;
    let scenarios: Vec<Scenario> = builtin_scenarios()
        .into_iter()
        .map(|mut s| {
            s.path = "/broken".into();
            s
        })
        .collect();

    let results = runner().run(&base, &scenarios).await;

    // "disconnected" contains "connected", so the status check still passes.
    assert!(results[0].passed);

    let message = &results[1];
    assert!(!message.passed);
    assert_eq!(message.failures.len(), 1);
    assert_eq!(message.failures[0].kind, FailureKind::AssertionMismatch);
    assert!(
        message.failures[0]
            .actual_text
            .as_deref()
            .unwrap()
            .contains("Failed to connect")
    );
}

#[tokio::test]
async fn server_rendered_state_is_picked_up_while_waiting() {
    let base = spawn_fixture().await;
    let scenario = Scenario::new("warming", "/warming")
        .assert(Assertion::contains(".status", "connected"))
        .assert(Assertion::not_contains(".message-box", "Loading"));

    let results = runner().run(&base, &[scenario]).await;

    assert!(results[0].passed, "{:?}", results[0].failures);
}

#[tokio::test]
async fn missing_selector_reports_not_found() {
    let base = spawn_fixture().await;
    let scenario =
        Scenario::new("missing", "/").assert(Assertion::contains("#does-not-exist", "anything"));

    let results = runner().run(&base, &[scenario]).await;

    assert_eq!(results[0].failures[0].kind, FailureKind::SelectorNotFound);
    assert_eq!(results[0].failures[0].actual_display(), "not found");
}

#[tokio::test]
async fn http_error_is_navigation_error_and_isolated() {
    let base = spawn_fixture().await;
    let failing = Scenario::new("error page", "/error")
        .assert(Assertion::contains(".status", "connected"));
    let healthy =
        Scenario::new("home", "/").assert(Assertion::contains(".status", "connected"));

    let results = runner().run(&base, &[failing, healthy]).await;

    assert_eq!(results[0].failures.len(), 1);
    assert_eq!(results[0].failures[0].kind, FailureKind::NavigationError);
    assert!(
        results[0].failures[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("HTTP 500")
    );
    assert!(results[1].passed);
}

#[tokio::test]
async fn unreachable_target_fails_every_scenario_with_navigation_error() {
    let base = unused_base_url().await;

    let results = runner().run(&base, &builtin_scenarios()).await;

    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(!result.passed);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].kind, FailureKind::NavigationError);
    }
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let base = spawn_fixture().await;
    let scenarios = builtin_scenarios();
    let runner = runner();

    let first = runner.run(&base, &scenarios).await;
    let second = runner.run(&base, &scenarios).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn context_exposes_page_text() {
    let base = spawn_fixture().await;
    let browser = HttpBrowser::new().unwrap();

    let page = browser
        .open(base.as_str(), Duration::from_secs(5))
        .await
        .unwrap();
    let text = page.text_of(".message-box").await.unwrap().unwrap();
    assert!(text.contains("Backend Message"));
    assert!(text.contains("successfully integrated"));
    assert_eq!(page.text_of(".nope").await.unwrap(), None);
    page.close().await;
}
