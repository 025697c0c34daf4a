//! Test utilities: a scripted in-memory browser.
//!
//! Each page maps selectors to a sequence of observed texts. A context
//! replays its page's script from the start, one entry per sample, and
//! keeps returning the last entry once the script runs out.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::traits::{Browser, BrowsingContext};

// ---------------------------------------------------------------------------
// MockPage
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockPage {
    elements: HashMap<String, Vec<Option<String>>>,
    selector_errors: HashMap<String, String>,
    load_errors: HashMap<String, String>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// An element whose text never changes.
    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.elements
            .insert(selector.to_string(), vec![Some(text.to_string())]);
        self
    }

    /// An element whose text changes between samples. `None` means absent.
    pub fn with_sequence(mut self, selector: &str, frames: Vec<Option<&str>>) -> Self {
        self.elements.insert(
            selector.to_string(),
            frames.into_iter().map(|f| f.map(str::to_string)).collect(),
        );
        self
    }

    pub fn with_selector_error(mut self, selector: &str, msg: &str) -> Self {
        self.selector_errors
            .insert(selector.to_string(), msg.to_string());
        self
    }

    /// Every sample of this selector fails as if the page could not be reloaded.
    pub fn with_load_error(mut self, selector: &str, msg: &str) -> Self {
        self.load_errors.insert(selector.to_string(), msg.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// MockBrowser
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockBrowser {
    pages: Arc<Mutex<HashMap<String, MockPage>>>,
    unreachable: Arc<Mutex<HashSet<String>>>,
    hanging: Arc<Mutex<HashSet<String>>>,
    open_delay: Option<Duration>,
    /// URLs of successfully opened contexts, in order.
    pub opened: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicUsize>,
    /// Total `text_of` calls across all contexts.
    pub samples: Arc<AtomicUsize>,
    /// Contexts currently opening or open.
    pub live: Arc<AtomicUsize>,
    pub max_live: Arc<AtomicUsize>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, page: MockPage) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), page);
        self
    }

    /// Opening this URL fails with a navigation error.
    pub fn with_unreachable(self, url: &str) -> Self {
        self.unreachable.lock().unwrap().insert(url.to_string());
        self
    }

    /// Opening this URL never loads; `open` gives up at its timeout.
    pub fn with_hanging(self, url: &str) -> Self {
        self.hanging.lock().unwrap().insert(url.to_string());
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }
}

impl Browser for MockBrowser {
    type Context = MockContext;

    async fn open(&self, url: &str, timeout: Duration) -> Result<MockContext, AppError> {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(now, Ordering::SeqCst);

        let hangs = self.hanging.lock().unwrap().contains(url);
        if hangs {
            tokio::time::sleep(timeout).await;
            self.live.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::NavigationError(format!(
                "Navigation to {url} timed out after {timeout:?}"
            )));
        }
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }

        let unreachable = self.unreachable.lock().unwrap().contains(url);
        if unreachable {
            self.live.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::NavigationError(format!(
                "net::ERR_CONNECTION_REFUSED at {url}"
            )));
        }

        let page = self.pages.lock().unwrap().get(url).cloned();
        let Some(page) = page else {
            self.live.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::NavigationError(format!("HTTP 404 for {url}")));
        };

        self.opened.lock().unwrap().push(url.to_string());

        Ok(MockContext {
            script: Mutex::new(
                page.elements
                    .into_iter()
                    .map(|(sel, frames)| (sel, VecDeque::from(frames)))
                    .collect(),
            ),
            selector_errors: page.selector_errors,
            load_errors: page.load_errors,
            closed: self.closed.clone(),
            samples: self.samples.clone(),
            live: self.live.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockContext
// ---------------------------------------------------------------------------

pub struct MockContext {
    script: Mutex<HashMap<String, VecDeque<Option<String>>>>,
    selector_errors: HashMap<String, String>,
    load_errors: HashMap<String, String>,
    closed: Arc<AtomicUsize>,
    samples: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl BrowsingContext for MockContext {
    async fn text_of(&self, selector: &str) -> Result<Option<String>, AppError> {
        self.samples.fetch_add(1, Ordering::SeqCst);

        if let Some(msg) = self.selector_errors.get(selector) {
            return Err(AppError::SelectorError(format!("{selector}: {msg}")));
        }
        if let Some(msg) = self.load_errors.get(selector) {
            return Err(AppError::HttpError(msg.clone()));
        }

        let mut script = self.script.lock().unwrap();
        let Some(frames) = script.get_mut(selector) else {
            return Ok(None);
        };
        let frame = if frames.len() > 1 {
            frames.pop_front().flatten()
        } else {
            frames.front().cloned().flatten()
        };
        Ok(frame)
    }

    async fn close(self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
