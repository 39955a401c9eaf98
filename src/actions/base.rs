use crate::actions::interactions::Interaction;
use crate::dom::Snapshot;
use crate::types::ActionTarget;
use serde::{Deserialize, Serialize};

/// An action as it arrives from the caller:
/// `{"action":"click","ref":"r3"}` or `{"action":"fill","selector":"#q","value":"rust"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(flatten)]
    pub target: ActionTarget,
    #[serde(flatten)]
    pub interaction: Interaction,
}

impl ActionRequest {
    pub fn new(target: ActionTarget, interaction: Interaction) -> Self {
        Self {
            target,
            interaction,
        }
    }

    pub fn click(target: ActionTarget) -> Self {
        Self::new(target, Interaction::Click)
    }

    pub fn fill(target: ActionTarget, value: impl Into<String>) -> Self {
        Self::new(
            target,
            Interaction::Fill {
                value: value.into(),
            },
        )
    }

    pub fn type_text(target: ActionTarget, text: impl Into<String>) -> Self {
        Self::new(target, Interaction::Type { text: text.into() })
    }

    pub fn action_name(&self) -> &'static str {
        self.interaction.name()
    }
}

/// Result of a successful action, carrying the snapshot taken after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub action: String,
    pub target: ActionTarget,
    pub message: String,
    pub execution_time_ms: u64,
    pub snapshot: Snapshot,
}
