use crate::core::config::InteractionConfig;
use crate::core::{BrowserTrait, ClickOptions};
use crate::errors::{BrowserAgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// One interaction against an already-resolved element.
///
/// Serialized with an `action` tag, e.g. `{"action":"fill","value":"bob"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Interaction {
    Click,
    Fill { value: String },
    Type { text: String },
    Hover,
    SelectOption { values: Vec<String> },
    SetInputFiles {
        #[serde(rename = "files")]
        paths: Vec<PathBuf>,
    },
    PressKey { key: String },
    ScrollIntoView,
}

impl Interaction {
    pub fn name(&self) -> &'static str {
        match self {
            Interaction::Click => "click",
            Interaction::Fill { .. } => "fill",
            Interaction::Type { .. } => "type",
            Interaction::Hover => "hover",
            Interaction::SelectOption { .. } => "select_option",
            Interaction::SetInputFiles { .. } => "set_input_files",
            Interaction::PressKey { .. } => "press_key",
            Interaction::ScrollIntoView => "scroll_into_view",
        }
    }
}

/// Runs a single attempt of `interaction`, including its own fallback.
///
/// Returns a short human-readable summary of what happened. Retrying the
/// whole attempt is the caller's job.
pub async fn perform<B: BrowserTrait>(
    browser: &B,
    tab: &B::TabHandle,
    element: &B::ElementHandle,
    interaction: &Interaction,
    config: &InteractionConfig,
) -> Result<String> {
    match interaction {
        Interaction::Click => click(browser, tab, element, config).await,
        Interaction::Fill { value } => {
            match browser.fill(tab, element, value, config.action_timeout()).await {
                Ok(()) => Ok(format!("Filled {} characters", value.chars().count())),
                Err(e) if !e.is_transient() => {
                    debug!(error = %e, "fill rejected, typing instead");
                    browser
                        .type_text(tab, element, value, config.action_timeout())
                        .await?;
                    Ok(format!("Typed {} characters", value.chars().count()))
                }
                Err(e) => Err(e),
            }
        }
        Interaction::Type { text } => {
            match browser.type_text(tab, element, text, config.action_timeout()).await {
                Ok(()) => Ok(format!("Typed {} characters", text.chars().count())),
                Err(e) if !e.is_transient() => {
                    debug!(error = %e, "typing rejected, filling instead");
                    browser
                        .fill(tab, element, text, config.action_timeout())
                        .await?;
                    Ok(format!("Filled {} characters", text.chars().count()))
                }
                Err(e) => Err(e),
            }
        }
        Interaction::Hover => {
            scroll_best_effort(browser, tab, element, config).await;
            browser.hover(tab, element, config.action_timeout()).await?;
            Ok("Hovered".to_string())
        }
        Interaction::SelectOption { values } => {
            if values.is_empty() {
                return Err(BrowserAgentError::InvalidArgument(
                    "select_option needs at least one value".to_string(),
                ));
            }
            let selected = browser
                .select_option(tab, element, values, config.action_timeout())
                .await?;
            if selected.is_empty() {
                return Err(BrowserAgentError::InvalidArgument(format!(
                    "No option matched {}",
                    values.join(", ")
                )));
            }
            Ok(format!("Selected {}", selected.join(", ")))
        }
        Interaction::SetInputFiles { paths } => {
            for path in paths {
                if !path.exists() {
                    return Err(BrowserAgentError::InvalidArgument(format!(
                        "File not found: {}",
                        path.display()
                    )));
                }
            }
            browser
                .set_input_files(tab, element, paths, config.action_timeout())
                .await?;
            Ok(format!("Set {} file(s)", paths.len()))
        }
        Interaction::PressKey { key } => {
            browser
                .press_key(tab, Some(element), key, config.action_timeout())
                .await?;
            Ok(format!("Pressed {}", key))
        }
        Interaction::ScrollIntoView => {
            browser
                .scroll_into_view(tab, element, config.action_timeout())
                .await?;
            Ok("Scrolled into view".to_string())
        }
    }
}

/// Actionability-checked click with a short timeout, then a forced click.
async fn click<B: BrowserTrait>(
    browser: &B,
    tab: &B::TabHandle,
    element: &B::ElementHandle,
    config: &InteractionConfig,
) -> Result<String> {
    scroll_best_effort(browser, tab, element, config).await;

    match browser
        .click(tab, element, ClickOptions::checked(config.click_timeout()))
        .await
    {
        Ok(()) => Ok("Clicked".to_string()),
        Err(e) => {
            debug!(error = %e, "checked click failed, forcing");
            browser
                .click(tab, element, ClickOptions::forced(config.action_timeout()))
                .await?;
            Ok("Clicked (forced)".to_string())
        }
    }
}

async fn scroll_best_effort<B: BrowserTrait>(
    browser: &B,
    tab: &B::TabHandle,
    element: &B::ElementHandle,
    config: &InteractionConfig,
) {
    if let Err(e) = browser
        .scroll_into_view(tab, element, config.click_timeout())
        .await
    {
        debug!(error = %e, "scroll into view skipped");
    }
}
