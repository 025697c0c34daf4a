//! Scenario sources: JSON files and the built-in frontend checks.

use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Assertion, Scenario, validate_scenarios};

#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    List(Vec<Scenario>),
    Wrapped { scenarios: Vec<Scenario> },
}

/// Parse and validate a scenario document.
///
/// Accepts either a bare JSON array or an object with a `scenarios` array.
pub fn parse_scenarios(json: &str) -> Result<Vec<Scenario>, AppError> {
    let file: ScenarioFile = serde_json::from_str(json)?;
    let scenarios = match file {
        ScenarioFile::List(s) | ScenarioFile::Wrapped { scenarios: s } => s,
    };
    validate_scenarios(&scenarios)?;
    Ok(scenarios)
}

/// Load and validate scenarios from a JSON file.
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(format!(
            "Failed to read scenario file {}: {e}",
            path.display()
        ))
    })?;
    parse_scenarios(&raw)
}

/// The frontend checks run when no scenario file is given.
///
/// The root page must report the backend as connected and show the message
/// fetched from the backend API rather than the connection-failure text.
pub fn builtin_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("shows backend status as connected", "/")
            .assert(Assertion::contains(".status", "connected")),
        Scenario::new("shows backend message from API", "/")
            .assert(Assertion::contains(".message-box", "Backend Message"))
            .assert(Assertion::not_contains(".message-box", "Failed to connect")),
    ]
}
