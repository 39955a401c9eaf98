pub mod base;
pub mod interactions;
pub mod retry;

pub use base::{ActionOutcome, ActionRequest};
pub use interactions::{perform, Interaction};
pub use retry::{decide, with_retry, RetryDecision, RetryPolicy};
