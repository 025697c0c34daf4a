use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser as Chromium, BrowserConfig, Page};
use futures::StreamExt;
use pagecheck_core::error::AppError;
use pagecheck_core::traits::{Browser, BrowsingContext};
use tokio::time::Instant;

/// Headless-Chromium driver using the Chrome DevTools Protocol.
///
/// Unlike [`super::HttpBrowser`], pages run their JavaScript, so content
/// fetched client-side (status badges, API-backed messages) shows up in the
/// DOM the assertions inspect.
///
/// A single Chromium process is shared across all clones of this struct;
/// each context is a fresh tab that is closed when the scenario ends.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use pagecheck_client::ChromiumBrowser;
/// use pagecheck_core::traits::{Browser, BrowsingContext};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let browser = ChromiumBrowser::launch().await?;
/// let page = browser
///     .open("http://localhost:3000/", Duration::from_secs(30))
///     .await?;
/// println!("{:?}", page.text_of(".status").await?);
/// page.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChromiumBrowser {
    browser: Arc<Chromium>,
}

impl ChromiumBrowser {
    /// Launches a headless Chromium browser.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$CHROME_BIN`,
    /// a well-known install path, or the default lookup of `chromiumoxide`.
    pub async fn launch() -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        // Snap-packaged Chromium ships a wrapper that drops headless flags,
        // so the real binary inside the snap is preferred.
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Chromium::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
        })
    }

    /// `$CHROME_BIN` first, then well-known install locations.
    fn find_chrome_binary() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        const CANDIDATES: &[&str] = &[
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
    }
}

impl Browser for ChromiumBrowser {
    type Context = ChromiumContext;

    async fn open(&self, url: &str, timeout: Duration) -> Result<ChromiumContext, AppError> {
        let deadline = Instant::now() + timeout;

        let page = tokio::time::timeout(timeout, self.browser.new_page("about:blank"))
            .await
            .map_err(|_| {
                AppError::NavigationError(format!("Opening a tab timed out after {timeout:?}"))
            })?
            .map_err(|e| AppError::BrowserError(format!("Failed to open tab: {e}")))?;

        // Chrome reports net errors (refused, DNS, TLS) through the navigate response.
        let remaining = deadline.saturating_duration_since(Instant::now());
        let navigated = match tokio::time::timeout(remaining, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(format!("Failed to navigate to {url}: {e}")),
            Err(_) => Err(format!("Navigation to {url} timed out after {timeout:?}")),
        };
        if let Err(msg) = navigated {
            close_tab(page).await;
            return Err(AppError::NavigationError(msg));
        }

        // Some net errors still commit Chrome's internal error page.
        let landed = page.url().await.ok().flatten().unwrap_or_default();
        if landed.starts_with("chrome-error://") {
            close_tab(page).await;
            return Err(AppError::NavigationError(format!(
                "Failed to load {url}: browser showed an error page"
            )));
        }

        Ok(ChromiumContext { page })
    }
}

async fn close_tab(page: Page) {
    if let Err(e) = page.close().await {
        tracing::debug!(error = %e, "Failed to close tab");
    }
}

/// A Chromium tab opened by [`ChromiumBrowser`].
pub struct ChromiumContext {
    page: Page,
}

impl BrowsingContext for ChromiumContext {
    async fn text_of(&self, selector: &str) -> Result<Option<String>, AppError> {
        let expression = text_content_expression(selector)?;

        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to query '{selector}': {e}")))?;

        let outcome: QueryOutcome = result
            .into_value()
            .map_err(|e| AppError::BrowserError(format!("Unexpected query result: {e}")))?;

        match outcome {
            QueryOutcome::Invalid { error } => {
                Err(AppError::SelectorError(format!("{selector}: {error}")))
            }
            QueryOutcome::Matched { text } => Ok(text),
        }
    }

    async fn close(self) {
        close_tab(self.page).await;
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum QueryOutcome {
    Invalid { error: String },
    Matched { text: Option<String> },
}

/// Read-only JavaScript that collects the `textContent` of every match.
///
/// Evaluates to `{ text: null }` when nothing matches and `{ error }` when
/// the selector is rejected by `querySelectorAll`.
fn text_content_expression(selector: &str) -> Result<String, AppError> {
    let quoted = serde_json::to_string(selector)?;
    Ok(format!(
        "(() => {{ \
            let nodes; \
            try {{ nodes = document.querySelectorAll({quoted}); }} \
            catch (e) {{ return {{ error: String(e.message || e) }}; }} \
            if (nodes.length === 0) return {{ text: null }}; \
            return {{ text: Array.from(nodes, n => n.textContent || '').join('\\n') }}; \
        }})()"
    ))
}
