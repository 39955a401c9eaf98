use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::path::PathBuf;
use std::time::Duration;

/// Options for a single click attempt.
#[derive(Debug, Clone, Copy)]
pub struct ClickOptions {
    /// Skip the visible/enabled/stable checks and dispatch the click directly.
    pub force: bool,
    pub timeout: Duration,
}

impl ClickOptions {
    pub fn checked(timeout: Duration) -> Self {
        Self {
            force: false,
            timeout,
        }
    }

    pub fn forced(timeout: Duration) -> Self {
        Self {
            force: true,
            timeout,
        }
    }
}

/// Browser engine the snapshot and action pipeline runs against.
///
/// Every call that crosses into the browser may suspend and carries its own
/// timeout. Implementations must report driver failures through the
/// structured transient variants (`Timeout`, `ElementDetached`,
/// `TargetClosed`, `ContextDestroyed`) where they can tell.
#[async_trait]
pub trait BrowserTrait: Send + Sync {
    type TabHandle: Send + Sync;
    type ElementHandle: Clone + Debug + Send + Sync;

    /// Launch a new browser instance
    async fn launch(&mut self, config: &crate::core::Config) -> Result<()>;

    /// Create a new tab/page
    async fn new_tab(&self) -> Result<Self::TabHandle>;

    /// Navigate to a URL and wait for the load event
    async fn navigate(&self, tab: &Self::TabHandle, url: &str, timeout: Duration) -> Result<()>;

    /// Run `function` (a JavaScript function expression) in the page with
    /// `args` passed as its single argument. Both directions cross the
    /// boundary as plain JSON.
    async fn evaluate(
        &self,
        tab: &Self::TabHandle,
        function: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<Value>;

    /// First element matching a CSS selector, or `None`
    async fn query(
        &self,
        tab: &Self::TabHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<Self::ElementHandle>>;

    /// Whether the element behind `element` is still connected to the document
    async fn is_attached(&self, tab: &Self::TabHandle, element: &Self::ElementHandle)
    -> Result<bool>;

    async fn click(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        options: ClickOptions,
    ) -> Result<()>;

    /// Replace the element's value
    async fn fill(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        value: &str,
        timeout: Duration,
    ) -> Result<()>;

    /// Focus the element and send `text` as key strokes
    async fn type_text(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        text: &str,
        timeout: Duration,
    ) -> Result<()>;

    async fn hover(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        timeout: Duration,
    ) -> Result<()>;

    /// Select options by value or label; returns the labels now selected
    async fn select_option(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        values: &[String],
        timeout: Duration,
    ) -> Result<Vec<String>>;

    async fn set_input_files(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        files: &[PathBuf],
        timeout: Duration,
    ) -> Result<()>;

    /// Press a key, on `element` when given, otherwise on the focused element
    async fn press_key(
        &self,
        tab: &Self::TabHandle,
        element: Option<&Self::ElementHandle>,
        key: &str,
        timeout: Duration,
    ) -> Result<()>;

    async fn scroll_into_view(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        timeout: Duration,
    ) -> Result<()>;

    /// Get current URL
    async fn get_url(&self, tab: &Self::TabHandle) -> Result<String>;

    /// Get page title
    async fn get_title(&self, tab: &Self::TabHandle) -> Result<String>;

    /// Check if browser is still running
    fn is_running(&self) -> bool;

    /// Close the browser
    async fn close(&mut self) -> Result<()>;
}
