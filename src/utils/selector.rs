use crate::errors::{BrowserAgentError, Result};
use regex::Regex;
use std::sync::OnceLock;

const MAX_SELECTOR_LENGTH: usize = 512;

/// Characters a CSS selector may use here. Quoted attribute values may also
/// carry URL punctuation (`/`, `?`, `&`, `%`, `!`). Anything else (`<`, `;`,
/// braces, backticks, backslashes) is refused so a selector can never carry
/// markup or script into the page.
fn allowed_selector() -> &'static Regex {
    static ALLOWED: OnceLock<Regex> = OnceLock::new();
    ALLOWED.get_or_init(|| {
        Regex::new(
            r#"^(?:[A-Za-z0-9_\-#.\[\]=:*>+~(),^$|@ ]|"[A-Za-z0-9_\-#.\[\]=:*>+~(),^$|@ /?&%!']*"|'[A-Za-z0-9_\-#.\[\]=:*>+~(),^$|@ /?&%!"]*')+$"#,
        )
        .expect("valid selector regex")
    })
}

/// Validates a caller-supplied selector before it reaches the page.
pub fn sanitize_selector(selector: &str) -> Result<&str> {
    let trimmed = selector.trim();
    let reject = |reason: &str| BrowserAgentError::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(reject("selector is empty"));
    }
    if trimmed.len() > MAX_SELECTOR_LENGTH {
        return Err(reject("selector is too long"));
    }
    if trimmed.matches('"').count() % 2 != 0 || trimmed.matches('\'').count() % 2 != 0 {
        return Err(reject("selector has unbalanced quotes"));
    }
    if !allowed_selector().is_match(trimmed) {
        return Err(reject("selector contains disallowed characters"));
    }
    Ok(trimmed)
}

/// Selector that finds the element stamped with `ref_id`.
pub fn marker_selector(marker_attribute: &str, ref_id: &str) -> String {
    format!("[{}=\"{}\"]", marker_attribute, css_attr_escape(ref_id))
}

pub fn css_attr_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
