/// Smoke-test for `ChromiumBrowser`.
///
/// Launches a headless Chromium, loads <https://example.com>, and checks the
/// rendered `<h1>` through the same runner the CLI uses.
///
/// Run with:
///   cargo run -p pagecheck-client --example browser_smoke --features browser
use pagecheck_client::ChromiumBrowser;
use pagecheck_core::models::{Assertion, Scenario};
use pagecheck_core::{RunConfig, SmokeRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Launching headless browser...");
    let browser = ChromiumBrowser::launch().await?;
    let runner = SmokeRunner::new(browser, RunConfig::default());

    let base = url::Url::parse("https://example.com")?;
    let scenario = Scenario::new("example domain heading", "/")
        .assert(Assertion::contains("h1", "Example Domain"))
        .assert(Assertion::not_contains("h1", "Not Found"));

    let results = runner.run(&base, &[scenario]).await;

    for result in &results {
        println!(
            "{}: {}",
            result.scenario_name,
            if result.passed { "OK" } else { "FAILED" }
        );
        for failure in &result.failures {
            println!("  {} (actual: {:?})", failure.kind, failure.actual_display());
        }
    }

    anyhow::ensure!(results.iter().all(|r| r.passed), "browser smoke test failed");
    Ok(())
}
