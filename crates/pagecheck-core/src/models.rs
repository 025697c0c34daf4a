use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::join_base_url;
use crate::error::AppError;

/// Whether an assertion expects the substring to be present or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionMode {
    Contains,
    NotContains,
}

impl AssertionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssertionMode::Contains => "contains",
            AssertionMode::NotContains => "not_contains",
        }
    }

    /// Evaluate the mode against an observed element text.
    pub fn holds(&self, text: &str, expected: &str) -> bool {
        match self {
            AssertionMode::Contains => text.contains(expected),
            AssertionMode::NotContains => !text.contains(expected),
        }
    }
}

impl fmt::Display for AssertionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single content expectation against the element(s) matched by a CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub selector: String,
    pub mode: AssertionMode,
    #[serde(alias = "expected")]
    pub expected_substring: String,
}

impl Assertion {
    pub fn contains(selector: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            mode: AssertionMode::Contains,
            expected_substring: expected.into(),
        }
    }

    pub fn not_contains(selector: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            mode: AssertionMode::NotContains,
            expected_substring: expected.into(),
        }
    }

    pub fn holds(&self, text: &str) -> bool {
        self.mode.holds(text, &self.expected_substring)
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:?}",
            self.selector, self.mode, self.expected_substring
        )
    }
}

/// A named, independent end-to-end check against one target path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub path: String,
    pub assertions: Vec<Assertion>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            assertions: Vec::new(),
        }
    }

    /// Append an assertion (builder style).
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Join the base URL and this scenario's path.
    ///
    /// Exactly one `/` separates the two, whatever the base ends with or the
    /// path starts with. An empty path targets the base URL itself.
    pub fn target_url(&self, base_url: &Url) -> Result<Url, AppError> {
        join_base_url(base_url, &self.path).map_err(|e| match e {
            AppError::ConfigError(msg) => {
                AppError::ConfigError(format!("Scenario '{}': {msg}", self.name))
            }
            other => other,
        })
    }
}

/// Error taxonomy for a failed scenario or assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Target unreachable or returned a fatal load error.
    NavigationError,
    /// The selector never matched an element.
    SelectorNotFound,
    /// The element appeared but its text kept changing without matching.
    Timeout,
    /// The element's text settled on a value that does not satisfy the assertion.
    AssertionMismatch,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NavigationError => "NAVIGATION_ERROR",
            FailureKind::SelectorNotFound => "SELECTOR_NOT_FOUND",
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::AssertionMismatch => "ASSERTION_MISMATCH",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One failure entry in a [`RunResult`].
///
/// Navigation failures are not tied to an assertion, so they carry no
/// selector, mode, or expected substring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub selector: Option<String>,
    pub mode: Option<AssertionMode>,
    pub expected_substring: Option<String>,
    /// Last observed text. `None` when the selector never matched.
    pub actual_text: Option<String>,
    /// Driver error message or other diagnostic context.
    pub detail: Option<String>,
}

impl Failure {
    pub fn navigation(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::NavigationError,
            selector: None,
            mode: None,
            expected_substring: None,
            actual_text: None,
            detail: Some(detail.into()),
        }
    }

    pub fn for_assertion(
        kind: FailureKind,
        assertion: &Assertion,
        actual_text: Option<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            kind,
            selector: Some(assertion.selector.clone()),
            mode: Some(assertion.mode),
            expected_substring: Some(assertion.expected_substring.clone()),
            actual_text,
            detail,
        }
    }

    /// Observed text for display, `"not found"` when nothing matched.
    pub fn actual_display(&self) -> &str {
        self.actual_text.as_deref().unwrap_or("not found")
    }
}

/// Pass/fail outcome and failure detail for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub scenario_name: String,
    pub passed: bool,
    pub failures: Vec<Failure>,
}

impl RunResult {
    /// Build a result; `passed` is true iff there are no failures.
    pub fn from_failures(scenario_name: impl Into<String>, failures: Vec<Failure>) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            passed: failures.is_empty(),
            failures,
        }
    }
}

/// Check a scenario list loaded from configuration.
///
/// Names must be unique and non-blank, every scenario needs at least one
/// assertion, and selectors must be non-blank.
pub fn validate_scenarios(scenarios: &[Scenario]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for scenario in scenarios {
        if scenario.name.trim().is_empty() {
            return Err(AppError::ConfigError("Scenario name must not be blank".into()));
        }
        if !seen.insert(scenario.name.as_str()) {
            return Err(AppError::ConfigError(format!(
                "Duplicate scenario name '{}'",
                scenario.name
            )));
        }
        if scenario.assertions.is_empty() {
            return Err(AppError::ConfigError(format!(
                "Scenario '{}' has no assertions",
                scenario.name
            )));
        }
        if let Some(i) = scenario
            .assertions
            .iter()
            .position(|a| a.selector.trim().is_empty())
        {
            return Err(AppError::ConfigError(format!(
                "Scenario '{}' assertion #{} has a blank selector",
                scenario.name,
                i + 1
            )));
        }
    }
    Ok(())
}
