use serde::{Deserialize, Serialize};

/// One classified element as it comes back across the evaluation boundary.
///
/// `ref_id` is already stamped onto the live element under the marker
/// attribute when this value exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementCandidate {
    #[serde(rename = "ref")]
    pub ref_id: String,
    pub tag_name: String,
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ElementCandidate {
    pub fn new(ref_id: impl Into<String>, tag_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            tag_name: tag_name.into(),
            role: role.into(),
            name: String::new(),
            value: None,
            disabled: None,
            checked: None,
            expanded: None,
            options: None,
            description: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Elements with neither a name nor a value are noise and never emitted.
    pub fn is_meaningful(&self) -> bool {
        !self.name.trim().is_empty() || self.value.is_some()
    }
}

/// Truncates to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Collapses runs of whitespace to single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
