use std::sync::Mutex;
use std::time::Duration;

use pagecheck_core::error::AppError;
use pagecheck_core::traits::{Browser, BrowsingContext};
use reqwest::Client;
use scraper::{Html, Selector};

/// Browsing driver that loads pages over plain HTTP and inspects them with a
/// DOM parser.
///
/// No JavaScript runs, so this suits server-rendered pages and quick checks
/// in environments without Chromium. Every sample re-requests the document,
/// which lets server-side state changes show up while an assertion waits.
#[derive(Clone)]
pub struct HttpBrowser {
    client: Client,
    timeout: Duration,
}

impl HttpBrowser {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("pagecheck/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl Browser for HttpBrowser {
    type Context = HttpContext;

    async fn open(&self, url: &str, timeout: Duration) -> Result<HttpContext, AppError> {
        let html = get_document(&self.client, url, timeout).await?;
        tracing::debug!(%url, bytes = html.len(), "Loaded document");

        Ok(HttpContext {
            client: self.client.clone(),
            url: url.to_string(),
            timeout: self.timeout,
            loaded: Mutex::new(Some(html)),
        })
    }
}

/// A page loaded by [`HttpBrowser`].
pub struct HttpContext {
    client: Client,
    url: String,
    timeout: Duration,
    /// Document from navigation, consumed by the first sample.
    loaded: Mutex<Option<String>>,
}

impl BrowsingContext for HttpContext {
    async fn text_of(&self, selector: &str) -> Result<Option<String>, AppError> {
        let cached = self.loaded.lock().ok().and_then(|mut doc| doc.take());
        let html = match cached {
            Some(html) => html,
            None => get_document(&self.client, &self.url, self.timeout).await?,
        };
        select_text(&html, selector)
    }

    async fn close(self) {
        tracing::debug!(url = %self.url, "Closed HTTP context");
    }
}

async fn get_document(client: &Client, url: &str, timeout: Duration) -> Result<String, AppError> {
    let response = client.get(url).timeout(timeout).send().await.map_err(|e| {
        if e.is_timeout() {
            AppError::Timeout(timeout.as_secs())
        } else if e.is_connect() {
            AppError::NavigationError(format!("Connection failed for {url}: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::HttpError(format!(
            "HTTP {} for {}",
            status.as_u16(),
            url
        )));
    }

    response
        .text()
        .await
        .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
}

/// Text content of every element matching `selector`, joined with `\n`.
///
/// Returns `Ok(None)` when nothing matches.
pub fn select_text(html: &str, selector: &str) -> Result<Option<String>, AppError> {
    let parsed = Selector::parse(selector)
        .map_err(|e| AppError::SelectorError(format!("{selector}: {e}")))?;

    let document = Html::parse_document(html);
    let texts: Vec<String> = document
        .select(&parsed)
        .map(|el| el.text().collect::<String>())
        .collect();

    if texts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(texts.join("\n")))
    }
}
