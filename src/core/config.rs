use crate::dom::Verbosity;
use crate::errors::{BrowserAgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub snapshot: SnapshotConfig,
    pub interaction: InteractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub disable_images: bool,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

/// Knobs for the classify → bind → assemble pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Attribute written onto each classified element so the binder can
    /// re-find it in a second query round.
    pub marker_attribute: String,
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub default_verbosity: Verbosity,
    pub classify_timeout_ms: u64,
    pub bind_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Budget for the actionability-checked click before the forced fallback.
    pub click_timeout_ms: u64,
    pub action_timeout_ms: u64,
    pub query_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let marker = &self.snapshot.marker_attribute;
        if !marker.starts_with("data-")
            || marker.len() <= "data-".len()
            || !marker
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(BrowserAgentError::ConfigurationError(format!(
                "marker_attribute must be a lowercase data-* attribute name, got '{}'",
                marker
            )));
        }

        if self.snapshot.max_name_length == 0 {
            return Err(BrowserAgentError::ConfigurationError(
                "max_name_length must be greater than zero".to_string(),
            ));
        }

        let timeouts = [
            ("click_timeout_ms", self.interaction.click_timeout_ms),
            ("action_timeout_ms", self.interaction.action_timeout_ms),
            ("query_timeout_ms", self.interaction.query_timeout_ms),
            ("navigation_timeout_ms", self.interaction.navigation_timeout_ms),
            ("classify_timeout_ms", self.snapshot.classify_timeout_ms),
            ("bind_timeout_ms", self.snapshot.bind_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(BrowserAgentError::ConfigurationError(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl InteractionConfig {
    pub fn click_timeout(&self) -> Duration {
        Duration::from_millis(self.click_timeout_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

impl SnapshotConfig {
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }

    pub fn bind_timeout(&self) -> Duration {
        Duration::from_millis(self.bind_timeout_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            disable_images: false,
            args: vec![],
            timeout_ms: 30000,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            marker_attribute: "data-ref".to_string(),
            max_name_length: 100,
            max_description_length: 150,
            default_verbosity: Verbosity::Normal,
            classify_timeout_ms: 5000,
            bind_timeout_ms: 2000,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            click_timeout_ms: 2000,
            action_timeout_ms: 5000,
            query_timeout_ms: 2000,
            navigation_timeout_ms: 30000,
            settle_timeout_ms: 3000,
            retry_attempts: 1,
            retry_backoff_ms: 500,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
