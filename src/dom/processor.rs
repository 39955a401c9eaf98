use crate::core::config::SnapshotConfig;
use crate::dom::element::{normalize_whitespace, truncate_chars};
use crate::dom::roles::{candidate_selector, implicit_role, is_text_role, PASSWORD_MASK};
use crate::dom::{ElementCandidate, Snapshot};
use crate::errors::{BrowserAgentError, Result};
use crate::types::SnapshotOptions;
use crate::utils::selector::sanitize_selector;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

const LABELABLE_TAGS: &[&str] = &["input", "select", "textarea", "button", "meter", "output", "progress"];
const TEXT_INPUT_TYPES: &[&str] = &["", "text", "search", "email", "url", "tel", "password", "number"];

/// Applies the classification rules to a static HTML document.
///
/// There is no layout here, so the zero-size and computed-style checks
/// degrade to reading inline `style` attributes, and nothing is stamped:
/// refs label the result only.
pub struct DomProcessor {
    config: SnapshotConfig,
}

impl DomProcessor {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    pub fn snapshot_html(&self, url: &str, html: &str, options: &SnapshotOptions) -> Result<Snapshot> {
        let document = Html::parse_document(html);
        let title = Selector::parse("title")
            .ok()
            .and_then(|selector| {
                document
                    .select(&selector)
                    .next()
                    .map(|t| normalize_whitespace(&t.text().collect::<String>()))
            })
            .unwrap_or_default();
        let candidates = self.classify_document(&document, options)?;
        let verbosity = options.verbosity.unwrap_or(self.config.default_verbosity);
        Ok(Snapshot::assemble(url.to_string(), title, &candidates, verbosity))
    }

    pub fn classify_html(&self, html: &str, options: &SnapshotOptions) -> Result<Vec<ElementCandidate>> {
        let document = Html::parse_document(html);
        self.classify_document(&document, options)
    }

    fn classify_document(
        &self,
        document: &Html,
        options: &SnapshotOptions,
    ) -> Result<Vec<ElementCandidate>> {
        let candidates = parse_selector(&candidate_selector())?;

        let root = match options.scope.as_deref().map(str::trim) {
            Some(scope) if !scope.is_empty() => {
                let scope = sanitize_selector(scope)?;
                let scope_selector = parse_selector(scope)?;
                document.select(&scope_selector).next().ok_or_else(|| {
                    BrowserAgentError::SelectorNotFound {
                        action: "snapshot".to_string(),
                        selector: scope.to_string(),
                    }
                })?
            }
            _ => document.root_element(),
        };

        let index = DocumentIndex::build(document);
        let mut elements = Vec::new();

        for node in root.descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            if !candidates.matches(&element) {
                continue;
            }
            if options.max_refs.is_some_and(|max| elements.len() >= max) {
                break;
            }
            if is_hidden(&element) {
                continue;
            }

            let Some(role) = role_of(&element) else {
                continue;
            };
            let name = truncate_chars(&self.name_of(&element, &role, &index), self.config.max_name_length);
            let value = value_of(&element);
            if name.is_empty() && value.is_none() {
                continue;
            }

            let ref_id = format!("r{}", elements.len() + 1);
            let tag = element.value().name().to_string();
            let mut candidate = ElementCandidate::new(ref_id, tag.as_str(), role).with_name(name);
            candidate.value = value;
            candidate.disabled = is_disabled(&element).then_some(true);
            candidate.checked = checked_state(&element);
            candidate.expanded = element.value().attr("aria-expanded").map(|v| v == "true");
            if tag == "select" {
                candidate.options = Some(option_labels(&element));
            }
            let description = index
                .referenced_text(element.value().attr("aria-describedby"))
                .or_else(|| element.value().attr("aria-description").map(normalize_whitespace))
                .map(|d| truncate_chars(&d, self.config.max_description_length))
                .filter(|d| !d.is_empty());
            candidate.description = description;

            elements.push(candidate);
        }

        Ok(elements)
    }

    fn name_of(&self, element: &ElementRef, role: &str, index: &DocumentIndex) -> String {
        let el = element.value();
        let tag = el.name();
        let input_type = el.attr("type").unwrap_or("").to_ascii_lowercase();

        if let Some(text) = index.referenced_text(el.attr("aria-labelledby")) {
            return text;
        }

        if let Some(label) = non_empty(el.attr("aria-label")) {
            return label;
        }

        if LABELABLE_TAGS.contains(&tag) {
            let mut label_text: Vec<String> = el
                .attr("id")
                .and_then(|id| index.labels_for.get(id))
                .cloned()
                .unwrap_or_default();
            if label_text.is_empty() {
                if let Some(wrapping) = ancestors(element).find(|a| a.value().name() == "label") {
                    label_text.push(text_of(&wrapping));
                }
            }
            let joined = normalize_whitespace(&label_text.join(" "));
            if !joined.is_empty() {
                return joined;
            }
        }

        if tag == "img" || (tag == "input" && input_type == "image") {
            if let Some(alt) = non_empty(el.attr("alt")) {
                return alt;
            }
        }

        if let Some(title) = non_empty(el.attr("title")) {
            return title;
        }

        if tag == "textarea" || (tag == "input" && TEXT_INPUT_TYPES.contains(&input_type.as_str())) {
            if let Some(placeholder) = non_empty(el.attr("placeholder")) {
                return placeholder;
            }
        }

        if is_text_role(role) {
            let text = text_of(element);
            if !text.is_empty() {
                return text;
            }
        }

        if tag == "input" && matches!(input_type.as_str(), "submit" | "reset" | "button") {
            if let Some(value) = non_empty(el.attr("value")) {
                return value;
            }
        }

        String::new()
    }
}

/// Lookups that need the whole document: ids for `aria-labelledby` /
/// `aria-describedby`, and `<label for>` text.
struct DocumentIndex<'a> {
    by_id: HashMap<&'a str, ElementRef<'a>>,
    labels_for: HashMap<&'a str, Vec<String>>,
}

impl<'a> DocumentIndex<'a> {
    fn build(document: &'a Html) -> Self {
        let mut by_id = HashMap::new();
        let mut labels_for: HashMap<&str, Vec<String>> = HashMap::new();

        for node in document.root_element().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            if let Some(id) = element.value().attr("id") {
                by_id.entry(id).or_insert(element);
            }
            if element.value().name() == "label" {
                if let Some(target) = element.value().attr("for") {
                    labels_for.entry(target).or_default().push(text_of(&element));
                }
            }
        }

        Self { by_id, labels_for }
    }

    fn referenced_text(&self, ids: Option<&str>) -> Option<String> {
        let text = ids?
            .split_whitespace()
            .filter_map(|id| self.by_id.get(id))
            .map(text_of)
            .collect::<Vec<_>>()
            .join(" ");
        let text = normalize_whitespace(&text);
        (!text.is_empty()).then_some(text)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| BrowserAgentError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn ancestors<'a>(element: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.ancestors().filter_map(ElementRef::wrap)
}

fn text_of(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(normalize_whitespace).filter(|v| !v.is_empty())
}

fn is_hidden(element: &ElementRef) -> bool {
    std::iter::once(*element)
        .chain(ancestors(element))
        .any(|node| {
            let el = node.value();
            if el.attr("hidden").is_some() || el.attr("aria-hidden") == Some("true") {
                return true;
            }
            el.attr("style").is_some_and(|style| {
                let style: String = style
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_ascii_lowercase();
                style.split(';').any(|decl| {
                    matches!(decl, "display:none" | "visibility:hidden" | "opacity:0")
                })
            })
        })
}

fn role_of(element: &ElementRef) -> Option<String> {
    let el = element.value();
    if let Some(explicit) = el.attr("role").and_then(|r| r.split_whitespace().next()) {
        return Some(explicit.to_string());
    }
    implicit_role(el.name(), |name| el.attr(name)).map(str::to_string)
}

fn value_of(element: &ElementRef) -> Option<String> {
    let el = element.value();
    let input_type = el.attr("type").unwrap_or("text").to_ascii_lowercase();
    match el.name() {
        "input" => match input_type.as_str() {
            "checkbox" | "radio" | "button" | "submit" | "reset" | "image" => None,
            "password" => Some(if el.attr("value").is_some_and(|v| !v.is_empty()) {
                PASSWORD_MASK.to_string()
            } else {
                String::new()
            }),
            _ => Some(el.attr("value").unwrap_or("").to_string()),
        },
        "textarea" => Some(element.text().collect::<String>()),
        "select" => {
            let options = option_elements(element);
            let mut selected: Vec<String> = options
                .iter()
                .filter(|o| o.value().attr("selected").is_some())
                .map(option_label)
                .collect();
            if selected.is_empty() && el.attr("multiple").is_none() {
                selected.extend(options.first().map(option_label));
            }
            (!selected.is_empty()).then(|| selected.join(", "))
        }
        _ => {
            if matches!(el.attr("contenteditable"), Some("") | Some("true")) {
                Some(text_of(element))
            } else if let Some(text) = el.attr("aria-valuetext") {
                Some(normalize_whitespace(text))
            } else {
                el.attr("aria-valuenow").map(normalize_whitespace)
            }
        }
    }
}

fn is_disabled(element: &ElementRef) -> bool {
    let el = element.value();
    let form_control = matches!(el.name(), "button" | "input" | "select" | "textarea" | "option");
    (form_control && el.attr("disabled").is_some()) || el.attr("aria-disabled") == Some("true")
}

fn checked_state(element: &ElementRef) -> Option<bool> {
    let el = element.value();
    let input_type = el.attr("type").unwrap_or("").to_ascii_lowercase();
    if el.name() == "input" && matches!(input_type.as_str(), "checkbox" | "radio") {
        return Some(el.attr("checked").is_some());
    }
    el.attr("aria-checked").map(|v| v == "true")
}

fn option_elements<'a>(select: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    select
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "option")
        .collect()
}

fn option_label(option: &ElementRef) -> String {
    non_empty(option.value().attr("label")).unwrap_or_else(|| text_of(option))
}

fn option_labels(select: &ElementRef) -> Vec<String> {
    option_elements(select).iter().map(option_label).collect()
}
