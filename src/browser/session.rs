use crate::actions::{perform, with_retry, ActionOutcome, ActionRequest, Interaction, RetryPolicy};
use crate::core::{BrowserTrait, Config, SessionTrait};
use crate::dom::Snapshot;
use crate::errors::{BrowserAgentError, Result};
use crate::types::{ActionTarget, SnapshotOptions};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

use super::capture::take_snapshot;
use super::navigation::NavigationManager;
use super::ref_table::RefTable;
use super::resolver;

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "file", "about", "data"];

/// A session shared between tasks. Holding the lock for a whole action keeps
/// one session's actions strictly sequential.
pub type SharedSession<B> = Arc<tokio::sync::Mutex<BrowserSession<B>>>;

/// One page, its latest snapshot and the ref table that goes with it.
pub struct BrowserSession<B: BrowserTrait> {
    browser: Arc<B>,
    tab: Option<B::TabHandle>,
    config: Config,
    ref_table: RefTable<B::ElementHandle>,
    last_snapshot: Option<Snapshot>,
    retry_policy: RetryPolicy,
    session_id: String,
}

impl<B: BrowserTrait> BrowserSession<B> {
    pub async fn new(mut browser: B, config: Config) -> Result<Self> {
        config.validate()?;
        browser.launch(&config).await?;
        let tab = browser.new_tab().await?;
        Ok(Self::from_parts(Arc::new(browser), tab, config))
    }

    /// Wraps a tab that is already open.
    pub fn from_parts(browser: Arc<B>, tab: B::TabHandle, config: Config) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let retry_policy = RetryPolicy::from_config(&config.interaction);
        debug!(session_id = %session_id, "session created");

        Self {
            browser,
            tab: Some(tab),
            config,
            ref_table: RefTable::new(),
            last_snapshot: None,
            retry_policy,
            session_id,
        }
    }

    pub fn shared(self) -> SharedSession<B> {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn browser(&self) -> &B {
        self.browser.as_ref()
    }

    pub fn ref_table(&self) -> &RefTable<B::ElementHandle> {
        &self.ref_table
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    fn tab(&self) -> Result<&B::TabHandle> {
        self.tab.as_ref().ok_or(BrowserAgentError::NoActiveTab)
    }

    /// Loads `url`, waits for the page to settle and returns a fresh snapshot.
    pub async fn navigate(&mut self, url: &str) -> Result<Snapshot> {
        let parsed = validate_url(url)?;
        info!(session_id = %self.session_id, url = %parsed, "navigating");

        // Refs from the previous page can never resolve again.
        self.ref_table.clear();
        self.last_snapshot = None;

        {
            let tab = self.tab()?;
            self.browser
                .navigate(
                    tab,
                    parsed.as_str(),
                    self.config.interaction.navigation_timeout(),
                )
                .await?;
            NavigationManager::wait_for_settle(
                self.browser.as_ref(),
                tab,
                self.config.interaction.settle_timeout(),
            )
            .await;
        }

        self.observe(&SnapshotOptions::default()).await
    }

    /// Takes a snapshot and makes its refs the only valid ones.
    pub async fn observe(&mut self, options: &SnapshotOptions) -> Result<Snapshot> {
        let captured = {
            let tab = self.tab()?;
            take_snapshot(self.browser.as_ref(), tab, &self.config.snapshot, options).await?
        };

        self.ref_table.replace(captured.ref_table);
        self.last_snapshot = Some(captured.snapshot.clone());
        Ok(captured.snapshot)
    }

    pub async fn resolve_element(
        &self,
        target: &ActionTarget,
        action: &str,
    ) -> Result<B::ElementHandle> {
        let tab = self.tab()?;
        resolver::resolve_element(
            self.browser.as_ref(),
            tab,
            &self.ref_table,
            target,
            action,
            self.config.interaction.query_timeout(),
        )
        .await
    }

    /// Resolve, interact with retry, settle, then snapshot again.
    ///
    /// The snapshot taken afterwards replaces the ref table, so every ref
    /// handed out before this call is invalid once it returns.
    pub async fn act(&mut self, request: &ActionRequest) -> Result<ActionOutcome> {
        let start_time = Instant::now();
        let action = request.action_name();
        info!(
            session_id = %self.session_id,
            action,
            target = %request.target,
            "performing action"
        );

        let message = {
            let browser = self.browser.as_ref();
            let tab = self.tab()?;
            let interaction_config = &self.config.interaction;
            let interaction = &request.interaction;

            let message = match interaction {
                Interaction::PressKey { key } if is_untargeted(&request.target) => {
                    with_retry(&self.retry_policy, action, || {
                        browser.press_key(tab, None, key, interaction_config.action_timeout())
                    })
                    .await?;
                    format!("Pressed {}", key)
                }
                _ => {
                    let element = self.resolve_element(&request.target, action).await?;
                    let element = &element;
                    with_retry(&self.retry_policy, action, || {
                        perform(browser, tab, element, interaction, interaction_config)
                    })
                    .await?
                }
            };

            NavigationManager::wait_for_settle(
                browser,
                tab,
                interaction_config.settle_timeout(),
            )
            .await;
            message
        };

        let snapshot = self.observe(&SnapshotOptions::default()).await?;
        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            session_id = %self.session_id,
            action,
            execution_time_ms,
            refs = snapshot.element_count(),
            "action completed"
        );

        Ok(ActionOutcome {
            action: action.to_string(),
            target: request.target.clone(),
            message,
            execution_time_ms,
            snapshot,
        })
    }

    pub async fn click(&mut self, target: ActionTarget) -> Result<ActionOutcome> {
        self.act(&ActionRequest::click(target)).await
    }

    pub async fn fill(&mut self, target: ActionTarget, value: &str) -> Result<ActionOutcome> {
        self.act(&ActionRequest::fill(target, value)).await
    }

    pub async fn type_text(&mut self, target: ActionTarget, text: &str) -> Result<ActionOutcome> {
        self.act(&ActionRequest::type_text(target, text)).await
    }

    pub async fn press_key(&mut self, key: &str) -> Result<ActionOutcome> {
        self.act(&ActionRequest::new(
            ActionTarget::default(),
            Interaction::PressKey {
                key: key.to_string(),
            },
        ))
        .await
    }

    pub async fn current_url(&self) -> Result<String> {
        let tab = self.tab()?;
        self.browser.get_url(tab).await
    }

    pub async fn close(&mut self) -> Result<()> {
        self.ref_table.clear();
        self.last_snapshot = None;
        self.tab = None;

        if let Some(browser) = Arc::get_mut(&mut self.browser) {
            browser.close().await?;
        }

        info!(session_id = %self.session_id, "session closed");
        Ok(())
    }
}

fn is_untargeted(target: &ActionTarget) -> bool {
    target.ref_id().is_none() && target.selector().is_none()
}

fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| BrowserAgentError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(BrowserAgentError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(parsed)
}

#[async_trait]
impl<B: BrowserTrait> SessionTrait<B> for BrowserSession<B> {
    async fn new(browser: B, config: Config) -> Result<Self> {
        Self::new(browser, config).await
    }

    async fn navigate(&mut self, url: &str) -> Result<Snapshot> {
        BrowserSession::navigate(self, url).await
    }

    async fn observe(&mut self, options: &SnapshotOptions) -> Result<Snapshot> {
        BrowserSession::observe(self, options).await
    }

    async fn act(&mut self, request: &ActionRequest) -> Result<ActionOutcome> {
        BrowserSession::act(self, request).await
    }

    async fn resolve_element(
        &self,
        target: &ActionTarget,
        action: &str,
    ) -> Result<B::ElementHandle> {
        BrowserSession::resolve_element(self, target, action).await
    }

    async fn current_url(&self) -> Result<String> {
        BrowserSession::current_url(self).await
    }

    async fn close(&mut self) -> Result<()> {
        BrowserSession::close(self).await
    }
}
