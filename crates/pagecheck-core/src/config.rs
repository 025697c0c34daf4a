use std::time::Duration;

use url::Url;

use crate::error::AppError;

/// Base URL used when no environment variable or flag provides one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Environment variable holding the base URL of the system under test.
pub const BASE_URL_ENV: &str = "PAGECHECK_BASE_URL";

/// Older variable name still honoured when [`BASE_URL_ENV`] is unset.
pub const LEGACY_BASE_URL_ENV: &str = "NEXT_PUBLIC_E2E_URL";

/// Parse and check a base URL: absolute, `http` or `https`, with a host.
pub fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::ConfigError(format!("Invalid base URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::ConfigError(format!(
                "Base URL scheme '{scheme}' is not supported (only http/https)"
            )));
        }
    }

    if url.host_str().is_none() {
        return Err(AppError::ConfigError(format!("Base URL '{raw}' has no host")));
    }

    Ok(url)
}

/// Append `path` to `base_url`, keeping any path prefix the base carries.
///
/// `http://host/app` + `/api/health` gives `http://host/app/api/health`.
/// An empty path targets the base itself with a trailing slash.
pub fn join_base_url(base_url: &Url, path: &str) -> Result<Url, AppError> {
    let base = base_url.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let joined = if path.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{path}")
    };
    Url::parse(&joined)
        .map_err(|e| AppError::ConfigError(format!("Invalid target '{joined}': {e}")))
}

/// Resolve the base URL from the environment, falling back to [`DEFAULT_BASE_URL`].
pub fn base_url_from_env() -> Result<Url, AppError> {
    resolve_base_url(|key| std::env::var(key).ok())
}

fn resolve_base_url(lookup: impl Fn(&str) -> Option<String>) -> Result<Url, AppError> {
    let raw = lookup(BASE_URL_ENV)
        .or_else(|| lookup(LEGACY_BASE_URL_ENV))
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    parse_base_url(&raw)
}

/// Polling schedule for the wait-for-content loop.
///
/// The first sample is taken immediately; subsequent waits start at
/// `interval` and double up to `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(50),
            max_interval: Duration::from_secs(1),
        }
    }
}

impl PollConfig {
    /// Delay before the next sample, given the delay used before the current one.
    pub fn next_delay(&self, current: Duration) -> Duration {
        std::cmp::min(current.saturating_mul(2), self.max_interval)
    }
}

/// Settings for a single run. Resolved once before the run and never mutated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Bound on opening a context and loading the target page.
    pub navigation_timeout: Duration,
    /// Bound on each assertion's wait-for-content loop.
    pub assertion_timeout: Duration,
    pub poll: PollConfig,
    /// Scenarios in flight at once.
    pub max_concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            assertion_timeout: Duration::from_secs(5),
            poll: PollConfig::default(),
            max_concurrency: 1,
        }
    }
}

impl RunConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PAGECHECK_NAV_TIMEOUT_SECS` (optional, defaults to 30)
    /// - `PAGECHECK_TIMEOUT_SECS` (optional, defaults to 5)
    /// - `PAGECHECK_CONCURRENCY` (optional, defaults to 1)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(secs) = positive_var(&lookup, "PAGECHECK_NAV_TIMEOUT_SECS")? {
            config.navigation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = positive_var(&lookup, "PAGECHECK_TIMEOUT_SECS")? {
            config.assertion_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = positive_var(&lookup, "PAGECHECK_CONCURRENCY")? {
            config.max_concurrency = n as usize;
        }

        Ok(config)
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_assertion_timeout(mut self, timeout: Duration) -> Self {
        self.assertion_timeout = timeout;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Zero is treated as one.
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }
}

fn positive_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, AppError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    Ok(Some(parsed))
}
