pub mod javascript;
pub mod selector;

pub use javascript::JavaScriptRunner;
pub use selector::{marker_selector, sanitize_selector};
