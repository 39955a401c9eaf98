use crate::dom::ElementCandidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

/// How much of each element a snapshot carries. Each level is a superset of
/// the one below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// ref, role, name
    Minimal,
    /// adds value, disabled, checked, expanded, options
    #[default]
    Normal,
    /// adds description
    Detailed,
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(Verbosity::Minimal),
            "normal" => Ok(Verbosity::Normal),
            "detailed" => Ok(Verbosity::Detailed),
            other => Err(format!(
                "unknown verbosity '{}' (expected minimal, normal or detailed)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotElement {
    #[serde(rename = "ref")]
    pub ref_id: String,
    pub role: String,
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

impl SnapshotElement {
    pub fn project(candidate: &ElementCandidate, verbosity: Verbosity) -> Self {
        let mut element = SnapshotElement {
            ref_id: candidate.ref_id.clone(),
            role: candidate.role.clone(),
            name: candidate.name.clone(),
            value: None,
            disabled: None,
            checked: None,
            expanded: None,
            options: None,
            description: None,
        };

        if verbosity >= Verbosity::Normal {
            element.value = candidate.value.clone();
            element.disabled = candidate.disabled;
            element.checked = candidate.checked;
            element.expanded = candidate.expanded;
            element.options = candidate.options.clone();
        }

        if verbosity >= Verbosity::Detailed {
            element.description = candidate.description.clone();
        }

        element
    }

    /// One line of the text rendering, e.g.
    /// `[r3] textbox "Email" value="a@b.c" (disabled)`.
    pub fn to_line(&self) -> String {
        let mut line = format!("[{}] {} \"{}\"", self.ref_id, self.role, self.name);
        if let Some(value) = &self.value {
            let _ = write!(line, " value=\"{}\"", value);
        }
        if self.disabled == Some(true) {
            line.push_str(" (disabled)");
        }
        match self.checked {
            Some(true) => line.push_str(" (checked)"),
            Some(false) => line.push_str(" (unchecked)"),
            None => {}
        }
        match self.expanded {
            Some(true) => line.push_str(" (expanded)"),
            Some(false) => line.push_str(" (collapsed)"),
            None => {}
        }
        if let Some(options) = &self.options {
            let _ = write!(line, " options=[{}]", options.join(", "));
        }
        if let Some(description) = &self.description {
            let _ = write!(line, " -- {}", description);
        }
        line
    }
}

/// What callers get back: page identity plus the ref-tagged elements in
/// document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub url: String,
    pub title: String,
    pub refs: Vec<SnapshotElement>,
    #[serde(skip, default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn assemble(
        url: String,
        title: String,
        candidates: &[ElementCandidate],
        verbosity: Verbosity,
    ) -> Self {
        Self {
            url,
            title,
            refs: candidates
                .iter()
                .map(|candidate| SnapshotElement::project(candidate, verbosity))
                .collect(),
            captured_at: Utc::now(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.refs.len()
    }

    pub fn find(&self, ref_id: &str) -> Option<&SnapshotElement> {
        self.refs.iter().find(|e| e.ref_id == ref_id)
    }

    pub fn find_by_role(&self, role: &str) -> Vec<&SnapshotElement> {
        self.refs.iter().filter(|e| e.role == role).collect()
    }

    pub fn find_by_name(&self, name: &str) -> Vec<&SnapshotElement> {
        let needle = name.to_lowercase();
        self.refs
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Lossy human-readable view; not meant to be parsed back.
    pub fn to_text(&self) -> String {
        let mut text = format!("url: {}\ntitle: {}\n", self.url, self.title);
        for element in &self.refs {
            text.push_str(&element.to_line());
            text.push('\n');
        }
        text
    }
}
