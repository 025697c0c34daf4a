mod common;
mod http_runner_tests;
mod readiness_tests;
