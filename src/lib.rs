pub mod actions;
pub mod browser;
pub mod core;
pub mod dom;
pub mod errors;
pub mod testing;
pub mod types;
pub mod utils;

pub use actions::{ActionOutcome, ActionRequest, Interaction, RetryPolicy};
#[cfg(feature = "chrome")]
pub use browser::ChromeBrowser;
pub use browser::{BrowserSession, RefTable, SharedSession};
pub use crate::core::{BrowserTrait, Config, SessionTrait};
pub use dom::{DomProcessor, Snapshot, SnapshotElement, Verbosity};
pub use errors::{BrowserAgentError, ErrorKind, Result};
pub use types::*;
