use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::RunConfig;
use crate::error::AppError;
use crate::models::{Assertion, Failure, FailureKind, RunResult, Scenario};
use crate::traits::{Browser, BrowsingContext};

/// Extra time the runner allows past the navigation timeout before giving up
/// on a driver that does not enforce it.
const NAVIGATION_GRACE: Duration = Duration::from_secs(1);

/// Events emitted by the runner for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    RunStarted {
        base_url: &'a Url,
        scenarios: usize,
    },
    ScenarioStarted {
        name: &'a str,
        url: &'a str,
    },
    NavigationFailed {
        name: &'a str,
        error: &'a str,
    },
    AssertionPassed {
        name: &'a str,
        assertion: &'a Assertion,
    },
    AssertionFailed {
        name: &'a str,
        failure: &'a Failure,
    },
    ScenarioFinished {
        result: &'a RunResult,
    },
    ScenarioSkipped {
        name: &'a str,
    },
    RunFinished {
        passed: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Trait for receiving runner events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::RunStarted {
                base_url,
                scenarios,
            } => {
                tracing::info!(%base_url, %scenarios, "Run started");
            }
            RunEvent::ScenarioStarted { name, url } => {
                tracing::info!(scenario = %name, %url, "Scenario started");
            }
            RunEvent::NavigationFailed { name, error } => {
                tracing::warn!(scenario = %name, %error, "Navigation failed");
            }
            RunEvent::AssertionPassed { name, assertion } => {
                tracing::debug!(scenario = %name, %assertion, "Assertion passed");
            }
            RunEvent::AssertionFailed { name, failure } => {
                tracing::warn!(
                    scenario = %name,
                    kind = %failure.kind,
                    selector = ?failure.selector,
                    actual = %failure.actual_display(),
                    "Assertion failed"
                );
            }
            RunEvent::ScenarioFinished { result } => {
                tracing::info!(
                    scenario = %result.scenario_name,
                    passed = %result.passed,
                    failures = %result.failures.len(),
                    "Scenario finished"
                );
            }
            RunEvent::ScenarioSkipped { name } => {
                tracing::info!(scenario = %name, "Scenario skipped (run cancelled)");
            }
            RunEvent::RunFinished {
                passed,
                failed,
                skipped,
            } => {
                tracing::info!(%passed, %failed, %skipped, "Run finished");
            }
        }
    }
}

/// Results of a run, in scenario order, plus the scenarios cancellation skipped.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub results: Vec<RunResult>,
    pub skipped: Vec<String>,
}

/// Navigates to each scenario's target and evaluates its assertions.
///
/// Generic over the browsing driver so the wait-and-assert protocol can be
/// tested without a real browser.
pub struct SmokeRunner<B: Browser> {
    browser: B,
    config: RunConfig,
}

impl<B: Browser> SmokeRunner<B> {
    pub fn new(browser: B, config: RunConfig) -> Self {
        Self { browser, config }
    }

    /// Run every scenario against `base_url`, logging through `tracing`.
    pub async fn run(&self, base_url: &Url, scenarios: &[Scenario]) -> Vec<RunResult> {
        self.run_with(
            base_url,
            scenarios,
            &CancellationToken::new(),
            &TracingRunReporter,
        )
        .await
        .results
    }

    /// Run every scenario, stopping before any scenario that has not started
    /// when `cancel_token` fires.
    ///
    /// Up to `max_concurrency` scenarios are in flight at once; results keep
    /// the input order. A failing scenario never stops the others.
    pub async fn run_with<R: RunReporter>(
        &self,
        base_url: &Url,
        scenarios: &[Scenario],
        cancel_token: &CancellationToken,
        reporter: &R,
    ) -> RunOutcome {
        reporter.report(RunEvent::RunStarted {
            base_url,
            scenarios: scenarios.len(),
        });

        let finished: Vec<Result<RunResult, &str>> = stream::iter(scenarios)
            .map(|scenario| async move {
                if cancel_token.is_cancelled() {
                    reporter.report(RunEvent::ScenarioSkipped {
                        name: &scenario.name,
                    });
                    return Err(scenario.name.as_str());
                }
                Ok(self.run_scenario(base_url, scenario, reporter).await)
            })
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut outcome = RunOutcome::default();
        for entry in finished {
            match entry {
                Ok(result) => outcome.results.push(result),
                Err(name) => outcome.skipped.push(name.to_string()),
            }
        }

        let passed = outcome.results.iter().filter(|r| r.passed).count();
        reporter.report(RunEvent::RunFinished {
            passed,
            failed: outcome.results.len() - passed,
            skipped: outcome.skipped.len(),
        });

        outcome
    }

    /// Run a single scenario in its own browsing context.
    pub async fn run_scenario<R: RunReporter>(
        &self,
        base_url: &Url,
        scenario: &Scenario,
        reporter: &R,
    ) -> RunResult {
        let url = match scenario.target_url(base_url) {
            Ok(url) => url,
            Err(e) => return navigation_failure(scenario, &e.to_string(), reporter),
        };

        reporter.report(RunEvent::ScenarioStarted {
            name: &scenario.name,
            url: url.as_str(),
        });

        let timeout = self.config.navigation_timeout;
        let opened = tokio::time::timeout(
            timeout + NAVIGATION_GRACE,
            self.browser.open(url.as_str(), timeout),
        )
        .await;
        let context = match opened {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => return navigation_failure(scenario, &e.to_string(), reporter),
            Err(_) => {
                let msg = format!(
                    "Navigation to {url} timed out after {}",
                    format_duration(timeout)
                );
                return navigation_failure(scenario, &msg, reporter);
            }
        };

        // No short-circuit: every assertion is evaluated.
        let mut outcomes = Vec::with_capacity(scenario.assertions.len());
        for assertion in &scenario.assertions {
            outcomes.push(self.await_assertion(&context, assertion).await);
        }
        self.recheck_final_text(&context, &scenario.assertions, &mut outcomes)
            .await;

        context.close().await;

        let mut failures = Vec::new();
        for (assertion, outcome) in scenario.assertions.iter().zip(outcomes) {
            match outcome {
                None => reporter.report(RunEvent::AssertionPassed {
                    name: &scenario.name,
                    assertion,
                }),
                Some(failure) => {
                    reporter.report(RunEvent::AssertionFailed {
                        name: &scenario.name,
                        failure: &failure,
                    });
                    failures.push(failure);
                }
            }
        }

        let result = RunResult::from_failures(&scenario.name, failures);
        reporter.report(RunEvent::ScenarioFinished { result: &result });
        result
    }

    /// Poll the element text until the assertion holds or the timeout elapses.
    ///
    /// Returns `None` on success, otherwise the classified failure.
    async fn await_assertion(
        &self,
        context: &B::Context,
        assertion: &Assertion,
    ) -> Option<Failure> {
        let poll = self.config.poll;
        let deadline = Instant::now() + self.config.assertion_timeout;
        let mut delay = poll.interval;

        let mut last_text: Option<String> = None;
        let mut settled = false;
        let mut page_loaded = false;
        let mut load_failed = false;
        let mut last_error: Option<String> = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let sample = self
                .sample(context, &assertion.selector, remaining.max(poll.interval))
                .await;

            match sample {
                Ok(Some(text)) => {
                    page_loaded = true;
                    if assertion.holds(&text) {
                        return None;
                    }
                    settled = last_text.as_deref() == Some(text.as_str());
                    last_text = Some(text);
                }
                Ok(None) => {
                    page_loaded = true;
                    settled = false;
                }
                Err(e @ AppError::SelectorError(_)) => {
                    // An unparseable selector will never match.
                    last_error = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    load_failed = e.is_navigation_failure();
                    last_error = Some(e.to_string());
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(delay.min(deadline - now)).await;
            delay = poll.next_delay(delay);
        }

        let kind = match (&last_text, settled) {
            (None, _) if load_failed && !page_loaded => FailureKind::NavigationError,
            (None, _) => FailureKind::SelectorNotFound,
            (Some(_), true) => FailureKind::AssertionMismatch,
            (Some(_), false) => FailureKind::Timeout,
        };
        let detail = last_error.or_else(|| {
            Some(format!(
                "waited {} for {}",
                format_duration(self.config.assertion_timeout),
                assertion
            ))
        });

        Some(Failure::for_assertion(kind, assertion, last_text, detail))
    }

    /// Sample every selector that has a passing assertion once more, and fail
    /// the assertions the final text no longer satisfies.
    ///
    /// Assertions on one selector must hold together on the same text, not
    /// each on a sample of its own.
    async fn recheck_final_text(
        &self,
        context: &B::Context,
        assertions: &[Assertion],
        outcomes: &mut [Option<Failure>],
    ) {
        let mut final_texts: HashMap<&str, Result<Option<String>, AppError>> = HashMap::new();
        for (assertion, outcome) in assertions.iter().zip(outcomes.iter()) {
            let selector = assertion.selector.as_str();
            if outcome.is_none() && !final_texts.contains_key(selector) {
                let sample = self
                    .sample(context, selector, self.config.assertion_timeout)
                    .await;
                final_texts.insert(selector, sample);
            }
        }

        for (assertion, outcome) in assertions.iter().zip(outcomes.iter_mut()) {
            if outcome.is_some() {
                continue;
            }
            let Some(final_text) = final_texts.get(assertion.selector.as_str()) else {
                continue;
            };
            match final_text {
                Ok(Some(text)) if assertion.holds(text) => {}
                Ok(Some(text)) => {
                    *outcome = Some(Failure::for_assertion(
                        FailureKind::AssertionMismatch,
                        assertion,
                        Some(text.clone()),
                        Some(format!("final text no longer satisfies {assertion}")),
                    ));
                }
                Ok(None) => {
                    *outcome = Some(Failure::for_assertion(
                        FailureKind::SelectorNotFound,
                        assertion,
                        None,
                        Some("element disappeared before the final check".to_string()),
                    ));
                }
                Err(e) => {
                    tracing::debug!(
                        selector = %assertion.selector,
                        error = %e,
                        "Final sample failed; keeping the earlier result"
                    );
                }
            }
        }
    }

    /// One `text_of` call, bounded by `budget`.
    async fn sample(
        &self,
        context: &B::Context,
        selector: &str,
        budget: Duration,
    ) -> Result<Option<String>, AppError> {
        tokio::time::timeout(budget, context.text_of(selector))
            .await
            .unwrap_or_else(|_| Err(AppError::Timeout(budget.as_secs().max(1))))
    }
}

fn navigation_failure<R: RunReporter>(scenario: &Scenario, error: &str, reporter: &R) -> RunResult {
    reporter.report(RunEvent::NavigationFailed {
        name: &scenario.name,
        error,
    });
    let result = RunResult::from_failures(&scenario.name, vec![Failure::navigation(error)]);
    reporter.report(RunEvent::ScenarioFinished { result: &result });
    result
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
