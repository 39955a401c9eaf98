use crate::actions::{ActionOutcome, ActionRequest};
use crate::core::{BrowserTrait, Config};
use crate::dom::Snapshot;
use crate::errors::Result;
use crate::types::{ActionTarget, SnapshotOptions};
use async_trait::async_trait;

/// What the action-dispatch layer needs from a browser session.
#[async_trait]
pub trait SessionTrait<B: BrowserTrait>: Send + Sync {
    async fn new(browser: B, config: Config) -> Result<Self>
    where
        Self: Sized;

    /// Load a URL and return the first snapshot of the new page
    async fn navigate(&mut self, url: &str) -> Result<Snapshot>;

    /// Take a fresh snapshot, replacing every previously issued ref
    async fn observe(&mut self, options: &SnapshotOptions) -> Result<Snapshot>;

    async fn act(&mut self, request: &ActionRequest) -> Result<ActionOutcome>;

    async fn resolve_element(
        &self,
        target: &ActionTarget,
        action: &str,
    ) -> Result<B::ElementHandle>;

    async fn current_url(&self) -> Result<String>;

    async fn close(&mut self) -> Result<()>;
}
