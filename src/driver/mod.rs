pub mod webdriver;

#[cfg(test)]
pub mod scripted;

use crate::error::DriverError;
use async_trait::async_trait;
use std::time::Duration;

/// How a configured selector string addresses the page.
///
/// Selectors are CSS by default; a `xpath=` prefix switches to XPath for
/// the few lookups that need text predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind<'a> {
    Css(&'a str),
    XPath(&'a str),
}

/// Splits the `xpath=` prefix convention off a selector string.
pub fn parse_selector(raw: &str) -> SelectorKind<'_> {
    match raw.strip_prefix("xpath=") {
        Some(rest) => SelectorKind::XPath(rest),
        None => SelectorKind::Css(raw),
    }
}

/// Identifier for one open browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabHandle(String);

impl TabHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The browser-automation seam the crawl engine runs against.
///
/// One production implementation drives a WebDriver session; tests use a
/// scripted in-memory stand-in. Operations return found-or-not where
/// absence is an expected outcome, and errors only for real failures.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate the current tab to a URL
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// Reload the current page
    async fn refresh(&self) -> Result<(), DriverError>;

    /// Wait until the document reports itself fully loaded
    async fn wait_until_ready(&self, timeout: Duration) -> Result<(), DriverError>;

    /// Wait for an element to appear, erring on timeout
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Wait for an element, reporting absence as `false` instead of an error
    async fn appears(&self, selector: &str, timeout: Duration) -> Result<bool, DriverError> {
        match self.wait_for_element(selector, timeout).await {
            Ok(()) => Ok(true),
            Err(DriverError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether the element is currently in the page
    async fn exists(&self, selector: &str) -> Result<bool, DriverError>;

    /// Click an element
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Click an element through script, bypassing hit-target checks
    async fn click_js(&self, selector: &str) -> Result<(), DriverError>;

    /// Clear a text input
    async fn clear(&self, selector: &str) -> Result<(), DriverError>;

    /// Type into an element one character at a time
    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        keystroke_delay: Duration,
    ) -> Result<(), DriverError>;

    /// Send the Enter key to an element
    async fn press_enter(&self, selector: &str) -> Result<(), DriverError>;

    /// Scroll an element into the viewport
    async fn scroll_into_view(&self, selector: &str) -> Result<(), DriverError>;

    /// Snapshot the current page's HTML
    async fn page_source(&self) -> Result<String, DriverError>;

    /// Open a new empty tab without switching to it
    async fn open_tab(&self) -> Result<TabHandle, DriverError>;

    /// Make the given tab current
    async fn switch_tab(&self, tab: &TabHandle) -> Result<(), DriverError>;

    /// Close the current tab; a switch must follow before other commands
    async fn close_current_tab(&self) -> Result<(), DriverError>;

    /// Handle of the current tab
    async fn current_tab(&self) -> Result<TabHandle, DriverError>;

    /// End the browser session
    async fn quit(&self) -> Result<(), DriverError>;
}
