//! In-memory browser for exercising the snapshot and action pipeline
//! without launching Chrome.

use crate::core::{BrowserTrait, ClickOptions, Config};
use crate::dom::classifier::CLASSIFIER_SCRIPT;
use crate::dom::element::{normalize_whitespace, truncate_chars};
use crate::dom::{ClassifyRequest, ElementCandidate};
use crate::errors::{BrowserAgentError, Result};
use crate::utils::marker_selector;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// One element on a fake page. Role and name are given up front instead of
/// being derived from markup.
#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    pub node_id: u64,
    pub tag: String,
    pub role: String,
    pub name: String,
    pub value: Option<String>,
    pub input_type: Option<String>,
    pub disabled: bool,
    pub hidden: bool,
    pub checked: Option<bool>,
    pub expanded: Option<bool>,
    pub options: Vec<String>,
    pub description: Option<String>,
    /// Selectors that match this node, e.g. `#u` or `button`.
    pub selectors: Vec<String>,
    /// Selectors of ancestors, used for scoped snapshots.
    pub scopes: Vec<String>,
    pub attached: bool,
    pub marker: Option<String>,
}

impl FakeNode {
    pub fn new(tag: &str, role: &str) -> Self {
        Self {
            tag: tag.to_string(),
            role: role.to_string(),
            attached: true,
            ..Default::default()
        }
    }

    /// A text input with an empty value.
    pub fn textbox(selector: &str, name: &str) -> Self {
        Self::new("input", "textbox")
            .named(name)
            .with_value("")
            .with_selector(selector)
    }

    pub fn button(selector: &str, name: &str) -> Self {
        Self::new("button", "button")
            .named(name)
            .with_selector(selector)
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_type(mut self, input_type: &str) -> Self {
        self.input_type = Some(input_type.to_string());
        self
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selectors.push(selector.to_string());
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn within(mut self, scope: &str) -> Self {
        self.scopes.push(scope.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.expanded = Some(expanded);
        self
    }

    fn matches(&self, selector: &str) -> bool {
        self.selectors.iter().any(|s| s == selector)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeHandle {
    pub node_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeClick {
    pub node_id: u64,
    pub forced: bool,
}

#[derive(Debug)]
struct FakePage {
    url: String,
    title: String,
    nodes: Vec<FakeNode>,
    next_id: u64,
    marker_attribute: String,
    settled: bool,
    routes: HashMap<String, (String, Vec<FakeNode>)>,
    failures: HashMap<String, VecDeque<BrowserAgentError>>,
    calls: HashMap<String, usize>,
    clicks: Vec<FakeClick>,
    keys: Vec<String>,
}

impl FakePage {
    fn enter(&mut self, op: &str) -> Result<()> {
        *self.calls.entry(op.to_string()).or_insert(0) += 1;
        match self.failures.get_mut(op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn adopt(&mut self, mut node: FakeNode) -> u64 {
        self.next_id += 1;
        node.node_id = self.next_id;
        node.attached = true;
        node.marker = None;
        self.nodes.push(node);
        self.next_id
    }

    fn live(&mut self, handle: &FakeHandle) -> Result<&mut FakeNode> {
        self.nodes
            .iter_mut()
            .find(|n| n.node_id == handle.node_id && n.attached)
            .ok_or_else(|| {
                BrowserAgentError::ElementDetached("Element is detached from the DOM".to_string())
            })
    }

    fn classify(&mut self, request: ClassifyRequest) -> Value {
        self.marker_attribute = request.marker_attribute.clone();
        for node in &mut self.nodes {
            node.marker = None;
        }

        if let Some(scope) = &request.scope {
            let exists = self
                .nodes
                .iter()
                .any(|n| n.attached && (n.matches(scope) || n.scopes.contains(scope)));
            if !exists {
                return json!({ "scopeFound": false, "elements": [] });
            }
        }

        let mut elements: Vec<ElementCandidate> = Vec::new();
        let mut next = 1;
        for node in &mut self.nodes {
            if let Some(max) = request.max_refs {
                if elements.len() >= max {
                    break;
                }
            }
            if !node.attached || node.hidden || node.role.is_empty() {
                continue;
            }
            if let Some(scope) = &request.scope {
                if !node.scopes.contains(scope) && !node.matches(scope) {
                    continue;
                }
            }

            let name = truncate_chars(&normalize_whitespace(&node.name), request.max_name_length);
            let value = node.value.as_ref().map(|v| {
                if node.input_type.as_deref() == Some("password") && !v.is_empty() {
                    request.password_mask.clone()
                } else {
                    v.clone()
                }
            });
            if name.is_empty() && value.is_none() {
                continue;
            }

            let ref_id = format!("r{}", next);
            next += 1;
            node.marker = Some(ref_id.clone());

            let mut candidate = ElementCandidate::new(ref_id, node.tag.as_str(), node.role.as_str())
                .with_name(name);
            candidate.value = value;
            candidate.disabled = node.disabled.then_some(true);
            candidate.checked = node.checked;
            candidate.expanded = node.expanded;
            candidate.options = (!node.options.is_empty()).then(|| node.options.clone());
            candidate.description = node
                .description
                .as_deref()
                .map(|d| truncate_chars(&normalize_whitespace(d), request.max_description_length))
                .filter(|d| !d.is_empty());
            elements.push(candidate);
        }

        json!({ "scopeFound": true, "elements": elements })
    }
}

/// A scripted page that implements [`BrowserTrait`].
///
/// Failures can be queued per operation name (`"click"`, `"query"`,
/// `"evaluate"`, ...) and every call is counted.
pub struct FakeBrowser {
    page: Mutex<FakePage>,
    running: bool,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            page: Mutex::new(FakePage {
                url: "about:blank".to_string(),
                title: String::new(),
                nodes: Vec::new(),
                next_id: 0,
                marker_attribute: "data-ref".to_string(),
                settled: true,
                routes: HashMap::new(),
                failures: HashMap::new(),
                calls: HashMap::new(),
                clicks: Vec::new(),
                keys: Vec::new(),
            }),
            running: false,
        }
    }

    pub fn with_page(url: &str, title: &str, nodes: Vec<FakeNode>) -> Self {
        let browser = Self::new();
        browser.load(url, title, nodes);
        browser
    }

    fn page(&self) -> MutexGuard<'_, FakePage> {
        self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the current document.
    pub fn load(&self, url: &str, title: &str, nodes: Vec<FakeNode>) {
        let mut page = self.page();
        page.url = url.to_string();
        page.title = title.to_string();
        for node in &mut page.nodes {
            node.attached = false;
        }
        page.nodes.clear();
        for node in nodes {
            page.adopt(node);
        }
    }

    /// Document served when `navigate` is called with `url`.
    pub fn route(&self, url: &str, title: &str, nodes: Vec<FakeNode>) {
        self.page()
            .routes
            .insert(url.to_string(), (title.to_string(), nodes));
    }

    pub fn add_node(&self, node: FakeNode) -> u64 {
        self.page().adopt(node)
    }

    /// Detaches the first live node matching `selector`.
    pub fn remove(&self, selector: &str) -> bool {
        let mut page = self.page();
        match page
            .nodes
            .iter_mut()
            .find(|n| n.attached && n.matches(selector))
        {
            Some(node) => {
                node.attached = false;
                true
            }
            None => false,
        }
    }

    /// Swaps the node matching `selector` for a new node in the same place,
    /// keeping the old node's marker, as a re-render would.
    pub fn rerender(&self, selector: &str) -> bool {
        let mut page = self.page();
        let Some(index) = page
            .nodes
            .iter()
            .position(|n| n.attached && n.matches(selector))
        else {
            return false;
        };

        page.next_id += 1;
        let fresh_id = page.next_id;
        let old = &mut page.nodes[index];
        old.attached = false;
        let mut fresh = old.clone();
        fresh.node_id = fresh_id;
        fresh.attached = true;
        page.nodes.insert(index + 1, fresh);
        true
    }

    pub fn fail_next(&self, op: &str, error: BrowserAgentError) {
        self.page()
            .failures
            .entry(op.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.page().calls.get(op).copied().unwrap_or(0)
    }

    pub fn clicks(&self) -> Vec<FakeClick> {
        self.page().clicks.clone()
    }

    pub fn pressed_keys(&self) -> Vec<String> {
        self.page().keys.clone()
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.page()
            .nodes
            .iter()
            .find(|n| n.attached && n.matches(selector))
            .and_then(|n| n.value.clone())
    }

    pub fn marker_of(&self, selector: &str) -> Option<String> {
        self.page()
            .nodes
            .iter()
            .find(|n| n.attached && n.matches(selector))
            .and_then(|n| n.marker.clone())
    }

    pub fn set_settled(&self, settled: bool) {
        self.page().settled = settled;
    }
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserTrait for FakeBrowser {
    type TabHandle = ();
    type ElementHandle = FakeHandle;

    async fn launch(&mut self, _config: &Config) -> Result<()> {
        self.page().enter("launch")?;
        self.running = true;
        Ok(())
    }

    async fn new_tab(&self) -> Result<()> {
        self.page().enter("new_tab")
    }

    async fn navigate(&self, _tab: &(), url: &str, _timeout: Duration) -> Result<()> {
        let routed = {
            let mut page = self.page();
            page.enter("navigate")?;
            page.routes.get(url).cloned()
        };
        match routed {
            Some((title, nodes)) => self.load(url, &title, nodes),
            None => self.page().url = url.to_string(),
        }
        Ok(())
    }

    async fn evaluate(
        &self,
        _tab: &(),
        function: &str,
        args: Value,
        _timeout: Duration,
    ) -> Result<Value> {
        let mut page = self.page();
        page.enter("evaluate")?;
        if function == CLASSIFIER_SCRIPT {
            let request: ClassifyRequest = serde_json::from_value(args)?;
            return Ok(page.classify(request));
        }
        if function.contains("readyState") {
            return Ok(Value::Bool(page.settled));
        }
        Ok(Value::Null)
    }

    async fn query(
        &self,
        _tab: &(),
        selector: &str,
        _timeout: Duration,
    ) -> Result<Option<FakeHandle>> {
        let mut page = self.page();
        page.enter("query")?;
        let marker_attribute = page.marker_attribute.clone();
        Ok(page
            .nodes
            .iter()
            .filter(|n| n.attached)
            .find(|n| {
                n.matches(selector)
                    || n.marker
                        .as_deref()
                        .map(|m| marker_selector(&marker_attribute, m) == selector)
                        .unwrap_or(false)
            })
            .map(|n| FakeHandle { node_id: n.node_id }))
    }

    async fn is_attached(&self, _tab: &(), element: &FakeHandle) -> Result<bool> {
        let mut page = self.page();
        page.enter("is_attached")?;
        Ok(page
            .nodes
            .iter()
            .any(|n| n.node_id == element.node_id && n.attached))
    }

    async fn click(&self, _tab: &(), element: &FakeHandle, options: ClickOptions) -> Result<()> {
        let mut page = self.page();
        page.enter("click")?;
        let node = page.live(element)?;
        if !options.force && (node.disabled || node.hidden) {
            return Err(BrowserAgentError::Timeout(format!(
                "Timeout {}ms exceeded waiting for element to be visible and enabled",
                options.timeout.as_millis()
            )));
        }
        if let Some(checked) = node.checked.as_mut() {
            *checked = !*checked;
        }
        let node_id = node.node_id;
        page.clicks.push(FakeClick {
            node_id,
            forced: options.force,
        });
        Ok(())
    }

    async fn fill(
        &self,
        _tab: &(),
        element: &FakeHandle,
        value: &str,
        _timeout: Duration,
    ) -> Result<()> {
        let mut page = self.page();
        page.enter("fill")?;
        let node = page.live(element)?;
        match node.value.as_mut() {
            Some(current) => {
                *current = value.to_string();
                Ok(())
            }
            None => Err(BrowserAgentError::InteractionFailed(
                "Element is not an <input>, <textarea> or [contenteditable] element".to_string(),
            )),
        }
    }

    async fn type_text(
        &self,
        _tab: &(),
        element: &FakeHandle,
        text: &str,
        _timeout: Duration,
    ) -> Result<()> {
        let mut page = self.page();
        page.enter("type_text")?;
        let node = page.live(element)?;
        match node.value.as_mut() {
            Some(current) => {
                current.push_str(text);
                Ok(())
            }
            None => Err(BrowserAgentError::InteractionFailed(
                "Element is not focusable for typing".to_string(),
            )),
        }
    }

    async fn hover(&self, _tab: &(), element: &FakeHandle, _timeout: Duration) -> Result<()> {
        let mut page = self.page();
        page.enter("hover")?;
        page.live(element)?;
        Ok(())
    }

    async fn select_option(
        &self,
        _tab: &(),
        element: &FakeHandle,
        values: &[String],
        _timeout: Duration,
    ) -> Result<Vec<String>> {
        let mut page = self.page();
        page.enter("select_option")?;
        let node = page.live(element)?;
        if node.tag != "select" {
            return Err(BrowserAgentError::InteractionFailed(
                "Element is not a <select> element".to_string(),
            ));
        }
        let selected: Vec<String> = node
            .options
            .iter()
            .filter(|o| values.contains(*o))
            .take(1)
            .cloned()
            .collect();
        if let Some(first) = selected.first() {
            node.value = Some(first.clone());
        }
        Ok(selected)
    }

    async fn set_input_files(
        &self,
        _tab: &(),
        element: &FakeHandle,
        files: &[PathBuf],
        _timeout: Duration,
    ) -> Result<()> {
        let mut page = self.page();
        page.enter("set_input_files")?;
        let node = page.live(element)?;
        if node.input_type.as_deref() != Some("file") {
            return Err(BrowserAgentError::InteractionFailed(
                "Node is not an HTMLInputElement of type file".to_string(),
            ));
        }
        node.value = files
            .first()
            .and_then(|f| f.file_name())
            .map(|f| f.to_string_lossy().into_owned());
        Ok(())
    }

    async fn press_key(
        &self,
        _tab: &(),
        element: Option<&FakeHandle>,
        key: &str,
        _timeout: Duration,
    ) -> Result<()> {
        let mut page = self.page();
        page.enter("press_key")?;
        if let Some(element) = element {
            page.live(element)?;
        }
        page.keys.push(key.to_string());
        Ok(())
    }

    async fn scroll_into_view(
        &self,
        _tab: &(),
        element: &FakeHandle,
        _timeout: Duration,
    ) -> Result<()> {
        let mut page = self.page();
        page.enter("scroll_into_view")?;
        page.live(element)?;
        Ok(())
    }

    async fn get_url(&self, _tab: &()) -> Result<String> {
        let mut page = self.page();
        page.enter("get_url")?;
        Ok(page.url.clone())
    }

    async fn get_title(&self, _tab: &()) -> Result<String> {
        let mut page = self.page();
        page.enter("get_title")?;
        Ok(page.title.clone())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn close(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }
}
