use crate::dom::Verbosity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which element an action should run against. `ref_id` wins when both are
/// present; empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTarget {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl ActionTarget {
    pub fn by_ref(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: Some(ref_id.into()),
            selector: None,
        }
    }

    pub fn by_selector(selector: impl Into<String>) -> Self {
        Self {
            ref_id: None,
            selector: Some(selector.into()),
        }
    }

    pub fn ref_id(&self) -> Option<&str> {
        non_blank(self.ref_id.as_deref())
    }

    pub fn selector(&self) -> Option<&str> {
        non_blank(self.selector.as_deref())
    }
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ref_id(), self.selector()) {
            (Some(ref_id), _) => write!(f, "ref {}", ref_id),
            (None, Some(selector)) => write!(f, "selector {}", selector),
            (None, None) => write!(f, "<no target>"),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Per-call snapshot options; unset fields use `SnapshotConfig`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOptions {
    /// CSS selector limiting classification to one subtree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<Verbosity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_refs: Option<usize>,
}

impl SnapshotOptions {
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    pub fn with_max_refs(mut self, max_refs: usize) -> Self {
        self.max_refs = Some(max_refs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_deserializes_ref_key() {
        let target: ActionTarget = serde_json::from_str(r#"{"ref": "r3"}"#).unwrap();
        assert_eq!(target.ref_id(), Some("r3"));
        assert_eq!(target.selector(), None);
    }

    #[test]
    fn blank_fields_are_not_meaningful() {
        let target = ActionTarget {
            ref_id: Some("  ".to_string()),
            selector: Some("#go".to_string()),
        };
        assert_eq!(target.ref_id(), None);
        assert_eq!(target.selector(), Some("#go"));
        assert_eq!(target.to_string(), "selector #go");
    }

    #[test]
    fn snapshot_options_use_camel_case() {
        let options: SnapshotOptions =
            serde_json::from_str(r#"{"maxRefs": 5, "verbosity": "minimal"}"#).unwrap();
        assert_eq!(options.max_refs, Some(5));
        assert_eq!(options.verbosity, Some(Verbosity::Minimal));
    }
}
