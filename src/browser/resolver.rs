use crate::browser::RefTable;
use crate::core::BrowserTrait;
use crate::errors::{BrowserAgentError, Result};
use crate::types::ActionTarget;
use crate::utils::selector::sanitize_selector;
use std::time::Duration;
use tracing::debug;

/// Binds an action target to a live element handle.
///
/// A ref is looked up in the session's table and checked for attachment;
/// a selector is sanitized and queried directly. Resolution failures are
/// final: retrying cannot fix them without the caller changing the target.
pub async fn resolve_element<B: BrowserTrait>(
    browser: &B,
    tab: &B::TabHandle,
    table: &RefTable<B::ElementHandle>,
    target: &ActionTarget,
    action: &str,
    timeout: Duration,
) -> Result<B::ElementHandle> {
    if let Some(ref_id) = target.ref_id() {
        let handle = table
            .get(ref_id)
            .ok_or_else(|| BrowserAgentError::RefNotFound {
                action: action.to_string(),
                ref_id: ref_id.to_string(),
                available: table.sample_refs(),
                total: table.len(),
            })?;

        if !browser.is_attached(tab, handle).await? {
            return Err(BrowserAgentError::StaleRef {
                action: action.to_string(),
                ref_id: ref_id.to_string(),
            });
        }

        debug!(action, ref_id, "resolved ref");
        return Ok(handle.clone());
    }

    if let Some(selector) = target.selector() {
        let selector = sanitize_selector(selector)?;
        return browser
            .query(tab, selector, timeout)
            .await?
            .ok_or_else(|| BrowserAgentError::SelectorNotFound {
                action: action.to_string(),
                selector: selector.to_string(),
            });
    }

    Err(BrowserAgentError::MissingTarget {
        action: action.to_string(),
    })
}
