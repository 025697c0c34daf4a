use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Opens isolated browsing contexts.
///
/// Each call to [`Browser::open`] yields a context that no other scenario
/// shares, already navigated to the requested URL.
pub trait Browser: Send + Sync + Clone {
    type Context: BrowsingContext;

    /// Open a fresh context and navigate it to `url` within `timeout`.
    ///
    /// The driver enforces `timeout` itself and releases anything it already
    /// allocated before returning an error. Any error returned here is
    /// reported as a navigation failure.
    fn open(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Context, AppError>> + Send;
}

/// A loaded page that can be inspected read-only.
pub trait BrowsingContext: Send + Sync {
    /// Text content of every element matching `selector`, joined with `\n`.
    ///
    /// Returns `Ok(None)` when no element matches.
    fn text_of(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    /// Release the context. Must never fail loudly.
    fn close(self) -> impl Future<Output = ()> + Send;
}
