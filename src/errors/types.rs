use thiserror::Error;

/// Number of currently valid refs listed in a "ref not found" message.
pub const MAX_LISTED_REFS: usize = 10;

/// Message fragments that mark a driver failure as transient when the driver
/// did not report a structured kind. Matched case-insensitively.
const TRANSIENT_SIGNATURES: &[&str] = &[
    "timeout",
    "timed out",
    "detached",
    "target closed",
    "page closed",
    "has been closed",
    "execution context was destroyed",
];

#[derive(Error, Debug)]
pub enum BrowserAgentError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser not launched")]
    BrowserNotLaunched,

    #[error("Tab creation failed: {0}")]
    TabCreationFailed(String),

    #[error("No active tab")]
    NoActiveTab,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("DOM extraction failed: {0}")]
    DomExtractionFailed(String),

    #[error("{action}: ref '{ref_id}' not found. {}", describe_available(.available, .total))]
    RefNotFound {
        action: String,
        ref_id: String,
        available: Vec<String>,
        total: usize,
    },

    #[error("{action}: ref '{ref_id}' is stale (element no longer attached to the page); take a new snapshot to get fresh refs")]
    StaleRef { action: String, ref_id: String },

    #[error("{action}: target must specify either a ref or a selector")]
    MissingTarget { action: String },

    #[error("{action}: no element matches selector '{selector}'")]
    SelectorNotFound { action: String, selector: String },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    ElementDetached(String),

    #[error("{0}")]
    TargetClosed(String),

    #[error("{0}")]
    ContextDestroyed(String),

    #[error("{0}")]
    InteractionFailed(String),

    /// Rejected before or after the driver call because of the caller's
    /// own arguments. Never retried, whatever the message says.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

pub type Result<T> = std::result::Result<T, BrowserAgentError>;

/// Recoverability class of a failure, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Ref unknown, no target given, or selector matched nothing.
    Unresolvable,
    /// Ref resolved to an element that has left the document.
    Stale,
    /// Worth one immediate retry.
    Transient,
    /// Everything else.
    NonTransient,
}

impl BrowserAgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RefNotFound { .. }
            | Self::MissingTarget { .. }
            | Self::SelectorNotFound { .. }
            | Self::InvalidSelector { .. } => ErrorKind::Unresolvable,
            Self::StaleRef { .. } => ErrorKind::Stale,
            Self::Timeout(_)
            | Self::ElementDetached(_)
            | Self::TargetClosed(_)
            | Self::ContextDestroyed(_) => ErrorKind::Transient,
            Self::InteractionFailed(message)
            | Self::JavaScriptFailed(message)
            | Self::NavigationFailed(message) => {
                if matches_transient_signature(message) {
                    ErrorKind::Transient
                } else {
                    ErrorKind::NonTransient
                }
            }
            _ => ErrorKind::NonTransient,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Maps an opaque driver message onto the structured transient kinds
    /// where one fits; anything else becomes `InteractionFailed`. The
    /// message is kept verbatim.
    pub fn from_driver_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            Self::Timeout(message)
        } else if lower.contains("detached") {
            Self::ElementDetached(message)
        } else if lower.contains("execution context was destroyed") {
            Self::ContextDestroyed(message)
        } else if lower.contains("target closed")
            || lower.contains("page closed")
            || lower.contains("has been closed")
        {
            Self::TargetClosed(message)
        } else {
            Self::InteractionFailed(message)
        }
    }
}

pub fn matches_transient_signature(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_SIGNATURES
        .iter()
        .any(|signature| lower.contains(signature))
}

fn describe_available(available: &[String], total: &usize) -> String {
    let total = *total;
    if total == 0 {
        return "No refs are available; take a snapshot first.".to_string();
    }
    let listed = available.join(", ");
    if total > available.len() {
        format!("Valid refs: {} ... ({} total)", listed, total)
    } else {
        format!("Valid refs: {}", listed)
    }
}

// headless_chrome reports every failure as anyhow::Error
impl From<anyhow::Error> for BrowserAgentError {
    fn from(err: anyhow::Error) -> Self {
        BrowserAgentError::from_driver_message(err.to_string())
    }
}
