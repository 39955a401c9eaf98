mod types;

pub use types::{matches_transient_signature, BrowserAgentError, ErrorKind, Result, MAX_LISTED_REFS};
