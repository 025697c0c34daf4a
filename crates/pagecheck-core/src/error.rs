use thiserror::Error;

/// Application-wide error types for pagecheck.
#[derive(Error, Debug)]
pub enum AppError {
    /// The target page could not be loaded.
    #[error("Navigation error: {0}")]
    NavigationError(String),

    /// A selector could not be parsed or evaluated.
    #[error("Selector error: {0}")]
    SelectorError(String),

    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Operation timed out.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Invalid configuration (base URL, scenario file, env vars).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The headless browser failed outside of a specific page operation.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error means the page could not be reached or loaded.
    pub fn is_navigation_failure(&self) -> bool {
        matches!(
            self,
            AppError::NavigationError(_) | AppError::HttpError(_) | AppError::Timeout(_)
        )
    }
}
