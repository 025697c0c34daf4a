pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{PollConfig, RunConfig};
pub use error::AppError;
pub use models::{Assertion, AssertionMode, Failure, FailureKind, RunResult, Scenario};
pub use report::RunReport;
pub use runner::{RunOutcome, SmokeRunner};
pub use traits::{Browser, BrowsingContext};
