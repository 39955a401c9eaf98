use crate::core::{BrowserTrait, ClickOptions, Config};
use crate::errors::{BrowserAgentError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use serde_json::{json, Value};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const ACTIONABLE_POLL: Duration = Duration::from_millis(50);
const ATTACH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);
const PAGE_INFO_TIMEOUT: Duration = Duration::from_secs(2);

/// Visible, enabled and connected.
const ACTIONABLE_FN: &str = r#"
function() {
    if (!this.isConnected) return false;
    const rect = this.getBoundingClientRect();
    const style = getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && !this.disabled;
}
"#;

const FORCE_CLICK_FN: &str = "function() { this.click(); return true; }";

const IS_CONNECTED_FN: &str = "function() { return this.isConnected; }";

/// Returns an error message, or an empty string on success.
const FILL_FN: &str = r#"
function(value) {
    if (this.isContentEditable) {
        this.focus();
        this.textContent = value;
    } else if ('value' in this && this.tagName !== 'SELECT' && this.tagName !== 'BUTTON') {
        if (this.readOnly) return 'Element is read-only';
        this.focus();
        this.value = value;
    } else {
        return 'Element is not an <input>, <textarea> or [contenteditable] element';
    }
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return '';
}
"#;

/// Returns `{"selected": [...]}` or `{"error": "..."}` as a JSON string.
const SELECT_FN: &str = r#"
function(wanted) {
    if (this.tagName !== 'SELECT') {
        return JSON.stringify({ error: 'Element is not a <select> element' });
    }
    const picked = [];
    for (const option of this.options) {
        const label = (option.label || option.textContent || '').trim();
        const hit = wanted.includes(option.value) || wanted.includes(label);
        if (this.multiple) {
            option.selected = hit;
            if (hit) picked.push(label);
        } else if (hit && picked.length === 0) {
            option.selected = true;
            picked.push(label);
        }
    }
    if (picked.length > 0) {
        this.dispatchEvent(new Event('input', { bubbles: true }));
        this.dispatchEvent(new Event('change', { bubbles: true }));
    }
    return JSON.stringify({ selected: picked });
}
"#;

/// Handle to an element in a Chrome tab.
///
/// headless_chrome elements borrow their tab, so the handle keeps the
/// selector that found it plus the backend node id, and re-locates the
/// node on every use. A different node behind the same selector reads as
/// detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromeElement {
    pub selector: String,
    pub backend_node_id: u32,
}

/// Chrome browser implementation
pub struct ChromeBrowser {
    browser: Option<Browser>,
}

impl ChromeBrowser {
    pub fn new() -> Self {
        Self { browser: None }
    }
}

impl Default for ChromeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a blocking headless_chrome call on the blocking pool under `timeout`.
async fn blocking<T, F>(
    what: &str,
    timeout: Duration,
    map_err: fn(String) -> BrowserAgentError,
    call: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(call);
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(map_err(e.to_string())),
        Ok(Err(join_error)) => Err(BrowserAgentError::InteractionFailed(format!(
            "{} panicked: {}",
            what, join_error
        ))),
        Err(_) => Err(BrowserAgentError::Timeout(format!(
            "Timeout {}ms exceeded while {}",
            timeout.as_millis(),
            what
        ))),
    }
}

fn driver_error(message: String) -> BrowserAgentError {
    BrowserAgentError::from_driver_message(message)
}

fn script_error(message: String) -> BrowserAgentError {
    let error = BrowserAgentError::from_driver_message(message);
    match error {
        BrowserAgentError::InteractionFailed(message) => {
            BrowserAgentError::JavaScriptFailed(message)
        }
        transient => transient,
    }
}

fn navigation_error(message: String) -> BrowserAgentError {
    let error = BrowserAgentError::from_driver_message(message);
    match error {
        BrowserAgentError::InteractionFailed(message) => {
            BrowserAgentError::NavigationFailed(message)
        }
        transient => transient,
    }
}

/// Finds the node behind `handle` again and checks it is the same node.
fn locate<'a>(tab: &'a Tab, handle: &ChromeElement) -> anyhow::Result<Element<'a>> {
    let element = tab.find_element(&handle.selector).map_err(|_| {
        anyhow!(
            "Element is detached from the DOM (selector {})",
            handle.selector
        )
    })?;
    if element.backend_node_id as u32 != handle.backend_node_id {
        return Err(anyhow!(
            "Node is detached from document (selector {} now matches another node)",
            handle.selector
        ));
    }
    Ok(element)
}

fn js_bool(element: &Element<'_>, function: &str) -> anyhow::Result<bool> {
    let result = element.call_js_fn(function, vec![], false)?;
    Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
}

fn js_string(element: &Element<'_>, function: &str, args: Vec<Value>) -> anyhow::Result<String> {
    let result = element.call_js_fn(function, args, false)?;
    Ok(result
        .value
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default())
}

/// Runs a side-effecting call to completion. Unlike [`blocking`] the task is
/// never abandoned, so an input event cannot land after the caller has moved
/// on to a fallback or a retry.
async fn dispatch<F>(what: &str, call: F) -> Result<()>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(result) => result.map_err(|e| driver_error(e.to_string())),
        Err(join_error) => Err(BrowserAgentError::InteractionFailed(format!(
            "{} panicked: {}",
            what, join_error
        ))),
    }
}

#[async_trait]
impl BrowserTrait for ChromeBrowser {
    type TabHandle = Arc<Tab>;
    type ElementHandle = ChromeElement;

    async fn launch(&mut self, config: &Config) -> Result<()> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.browser.viewport.width, config.browser.viewport.height
        );

        let user_agent_arg = config
            .browser
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        if config.browser.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }

        for arg in &config.browser.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.browser.headless)
            .idle_browser_timeout(Duration::from_millis(config.browser.timeout_ms))
            .args(args)
            .build()
            .map_err(|e| BrowserAgentError::LaunchFailed(e.to_string()))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| BrowserAgentError::LaunchFailed(e.to_string()))?;

        self.browser = Some(browser);
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        let browser = self
            .browser
            .as_ref()
            .ok_or(BrowserAgentError::BrowserNotLaunched)?;

        browser
            .new_tab()
            .map_err(|e| BrowserAgentError::TabCreationFailed(e.to_string()))
    }

    async fn navigate(&self, tab: &Self::TabHandle, url: &str, timeout: Duration) -> Result<()> {
        let tab = Arc::clone(tab);
        let url = url.to_string();
        blocking("navigating", timeout, navigation_error, move || {
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn evaluate(
        &self,
        tab: &Self::TabHandle,
        function: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let expression = format!(
            "(async () => JSON.stringify(await ({})({})))()",
            function.trim(),
            args
        );
        let tab = Arc::clone(tab);
        let raw = blocking("evaluating script", timeout, script_error, move || {
            let result = tab.evaluate(&expression, true)?;
            Ok(result.value)
        })
        .await?;

        match raw {
            Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
            _ => Ok(Value::Null),
        }
    }

    async fn query(
        &self,
        tab: &Self::TabHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<Self::ElementHandle>> {
        let tab = Arc::clone(tab);
        let owned = selector.to_string();
        let lookup = format!(
            "(() => {{ try {{ return document.querySelector({}) !== null ? 'found' : 'missing'; }} \
             catch (e) {{ return 'invalid: ' + e.message; }} }})()",
            serde_json::to_string(selector)?
        );
        let found = blocking("querying selector", timeout, driver_error, move || {
            let status = tab
                .evaluate(&lookup, false)?
                .value
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            if let Some(reason) = status.strip_prefix("invalid: ") {
                return Ok(Err(reason.to_string()));
            }
            if status != "found" {
                return Ok(Ok(None));
            }
            let element = tab.find_element(&owned)?;
            Ok(Ok(Some(ChromeElement {
                backend_node_id: element.backend_node_id as u32,
                selector: owned,
            })))
        })
        .await?;

        found.map_err(|reason| BrowserAgentError::InvalidSelector {
            selector: selector.to_string(),
            reason,
        })
    }

    async fn is_attached(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
    ) -> Result<bool> {
        let tab = Arc::clone(tab);
        let handle = element.clone();
        blocking(
            "checking attachment",
            ATTACH_CHECK_TIMEOUT,
            driver_error,
            move || match locate(&tab, &handle) {
                Ok(element) => js_bool(&element, IS_CONNECTED_FN),
                Err(_) => Ok(false),
            },
        )
        .await
    }

    async fn click(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        options: ClickOptions,
    ) -> Result<()> {
        if options.force {
            let tab = Arc::clone(tab);
            let handle = element.clone();
            return dispatch("force clicking", move || {
                js_bool(&locate(&tab, &handle)?, FORCE_CLICK_FN)?;
                Ok(())
            })
            .await;
        }

        // Actionability is polled from here with short read-only calls; the
        // click itself is dispatched once, after polling has finished.
        let deadline = Instant::now() + options.timeout;
        let point = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let tab = Arc::clone(tab);
            let handle = element.clone();
            let point = blocking(
                "checking actionability",
                remaining.max(ACTIONABLE_POLL),
                driver_error,
                move || {
                    let element = locate(&tab, &handle)?;
                    if js_bool(&element, ACTIONABLE_FN)? {
                        Ok(Some(element.get_midpoint()?))
                    } else {
                        Ok(None)
                    }
                },
            )
            .await?;
            if let Some(point) = point {
                break point;
            }
            if Instant::now() + ACTIONABLE_POLL >= deadline {
                return Err(BrowserAgentError::Timeout(format!(
                    "Timeout {}ms exceeded waiting for element to be visible and enabled",
                    options.timeout.as_millis()
                )));
            }
            tokio::time::sleep(ACTIONABLE_POLL).await;
        };

        let tab = Arc::clone(tab);
        dispatch("clicking", move || {
            tab.click_point(point)?;
            Ok(())
        })
        .await
    }

    async fn fill(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        value: &str,
        timeout: Duration,
    ) -> Result<()> {
        let tab = Arc::clone(tab);
        let handle = element.clone();
        let value = value.to_string();
        blocking("filling", timeout, driver_error, move || {
            let element = locate(&tab, &handle)?;
            let problem = js_string(&element, FILL_FN, vec![json!(value)])?;
            if problem.is_empty() {
                Ok(())
            } else {
                Err(anyhow!(problem))
            }
        })
        .await
    }

    async fn type_text(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        text: &str,
        timeout: Duration,
    ) -> Result<()> {
        let tab = Arc::clone(tab);
        let handle = element.clone();
        let text = text.to_string();
        blocking("typing", timeout, driver_error, move || {
            let element = locate(&tab, &handle)?;
            element.focus()?;
            tab.type_str(&text)?;
            Ok(())
        })
        .await
    }

    async fn hover(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        timeout: Duration,
    ) -> Result<()> {
        let tab = Arc::clone(tab);
        let handle = element.clone();
        blocking("hovering", timeout, driver_error, move || {
            locate(&tab, &handle)?.move_mouse_over()?;
            Ok(())
        })
        .await
    }

    async fn select_option(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        values: &[String],
        timeout: Duration,
    ) -> Result<Vec<String>> {
        let tab = Arc::clone(tab);
        let handle = element.clone();
        let wanted = json!(values);
        let reply = blocking("selecting option", timeout, driver_error, move || {
            let element = locate(&tab, &handle)?;
            js_string(&element, SELECT_FN, vec![wanted])
        })
        .await?;

        let reply: Value = serde_json::from_str(&reply)?;
        if let Some(error) = reply.get("error").and_then(Value::as_str) {
            return Err(BrowserAgentError::InteractionFailed(error.to_string()));
        }
        Ok(reply
            .get("selected")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|l| l.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_input_files(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        files: &[PathBuf],
        timeout: Duration,
    ) -> Result<()> {
        let tab = Arc::clone(tab);
        let handle = element.clone();
        let files: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        blocking("setting input files", timeout, driver_error, move || {
            let element = locate(&tab, &handle)?;
            let paths: Vec<&str> = files.iter().map(String::as_str).collect();
            element.set_input_files(&paths)?;
            Ok(())
        })
        .await
    }

    async fn press_key(
        &self,
        tab: &Self::TabHandle,
        element: Option<&Self::ElementHandle>,
        key: &str,
        timeout: Duration,
    ) -> Result<()> {
        let tab = Arc::clone(tab);
        let handle = element.cloned();
        let key = key.to_string();
        blocking("pressing key", timeout, driver_error, move || {
            if let Some(handle) = handle {
                locate(&tab, &handle)?.focus()?;
            }
            tab.press_key(&key)?;
            Ok(())
        })
        .await
    }

    async fn scroll_into_view(
        &self,
        tab: &Self::TabHandle,
        element: &Self::ElementHandle,
        timeout: Duration,
    ) -> Result<()> {
        let tab = Arc::clone(tab);
        let handle = element.clone();
        blocking("scrolling into view", timeout, driver_error, move || {
            locate(&tab, &handle)?.scroll_into_view()?;
            Ok(())
        })
        .await
    }

    async fn get_url(&self, tab: &Self::TabHandle) -> Result<String> {
        let tab = Arc::clone(tab);
        blocking("reading url", PAGE_INFO_TIMEOUT, driver_error, move || {
            Ok(tab.get_url())
        })
        .await
    }

    async fn get_title(&self, tab: &Self::TabHandle) -> Result<String> {
        let tab = Arc::clone(tab);
        blocking("reading title", PAGE_INFO_TIMEOUT, driver_error, move || {
            tab.get_title()
        })
        .await
    }

    fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        self.browser = None;
        Ok(())
    }
}
