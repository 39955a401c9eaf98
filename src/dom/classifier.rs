//! In-page element classification and ref stamping.
//!
//! The classifier runs inside the page's JavaScript context. It is driven as
//! a remote call: a [`ClassifyRequest`] is marshalled in as JSON, a
//! [`ClassifyResponse`] comes back as JSON. As a side effect every emitted
//! element carries its ref under the marker attribute, which is how the
//! binder finds it again in the next round.

use crate::core::config::SnapshotConfig;
use crate::core::BrowserTrait;
use crate::dom::roles::{candidate_selector, PASSWORD_MASK, TEXT_ROLES};
use crate::dom::ElementCandidate;
use crate::errors::{BrowserAgentError, Result};
use crate::types::SnapshotOptions;
use crate::utils::selector::sanitize_selector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub scope: Option<String>,
    pub marker_attribute: String,
    pub candidate_selector: String,
    pub text_roles: Vec<String>,
    pub password_mask: String,
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub max_refs: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub scope_found: bool,
    #[serde(default)]
    pub elements: Vec<ElementCandidate>,
}

impl ClassifyRequest {
    pub fn new(config: &SnapshotConfig, options: &SnapshotOptions) -> Result<Self> {
        let scope = match options.scope.as_deref().map(str::trim) {
            Some(scope) if !scope.is_empty() => Some(sanitize_selector(scope)?.to_string()),
            _ => None,
        };

        Ok(Self {
            scope,
            marker_attribute: config.marker_attribute.clone(),
            candidate_selector: candidate_selector(),
            text_roles: TEXT_ROLES.iter().map(|r| r.to_string()).collect(),
            password_mask: PASSWORD_MASK.to_string(),
            max_name_length: config.max_name_length,
            max_description_length: config.max_description_length,
            max_refs: options.max_refs,
        })
    }
}

/// Classifies the page (or the scoped subtree) and stamps refs onto the
/// surviving elements.
pub async fn classify_page<B: BrowserTrait>(
    browser: &B,
    tab: &B::TabHandle,
    request: &ClassifyRequest,
    timeout: Duration,
) -> Result<Vec<ElementCandidate>> {
    let args = serde_json::to_value(request)?;
    let raw = browser
        .evaluate(tab, CLASSIFIER_SCRIPT, args, timeout)
        .await?;

    let response: ClassifyResponse = serde_json::from_value(raw).map_err(|e| {
        BrowserAgentError::DomExtractionFailed(format!("unexpected classifier output: {}", e))
    })?;

    if !response.scope_found {
        return Err(BrowserAgentError::SelectorNotFound {
            action: "snapshot".to_string(),
            selector: request.scope.clone().unwrap_or_default(),
        });
    }

    debug!(
        count = response.elements.len(),
        scope = ?request.scope,
        "classified page elements"
    );
    Ok(response.elements)
}

pub const CLASSIFIER_SCRIPT: &str = r#"
(args) => {
    const marker = args.markerAttribute;
    for (const stale of document.querySelectorAll('[' + marker + ']')) {
        stale.removeAttribute(marker);
    }

    const root = args.scope ? document.querySelector(args.scope) : document;
    if (!root) {
        return { scopeFound: false, elements: [] };
    }

    const clean = (text) => (text || '').replace(/\s+/g, ' ').trim();
    const clip = (text, max) => Array.from(clean(text)).slice(0, max).join('');
    const textOf = (el) => clean(el.innerText || el.textContent || '');
    const attr = (el, name) => el.getAttribute(name);
    const textRoles = new Set(args.textRoles);
    const textInputTypes = new Set(['', 'text', 'search', 'email', 'url', 'tel', 'password', 'number']);

    const isHidden = (el) => {
        for (let node = el; node && node.nodeType === 1; node = node.parentElement) {
            if (node.hidden || attr(node, 'aria-hidden') === 'true') {
                return true;
            }
            const style = window.getComputedStyle(node);
            if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
                return true;
            }
        }
        const rect = el.getBoundingClientRect();
        return rect.width === 0 && rect.height === 0 && !attr(el, 'role');
    };

    const implicitRole = (el) => {
        const tag = el.tagName.toLowerCase();
        const type = (attr(el, 'type') || 'text').toLowerCase();
        switch (tag) {
            case 'a':
            case 'area':
                return el.hasAttribute('href') ? 'link' : null;
            case 'button':
                return 'button';
            case 'h1': case 'h2': case 'h3': case 'h4': case 'h5': case 'h6':
                return 'heading';
            case 'img':
                return clean(attr(el, 'alt')) ? 'img' : null;
            case 'textarea':
                return 'textbox';
            case 'select':
                return el.multiple ? 'listbox' : 'combobox';
            case 'option':
                return 'option';
            case 'dialog':
                return 'dialog';
            case 'input':
                switch (type) {
                    case 'button': case 'submit': case 'reset': case 'image':
                        return 'button';
                    case 'checkbox': return 'checkbox';
                    case 'radio': return 'radio';
                    case 'range': return 'slider';
                    case 'number': return 'spinbutton';
                    case 'search': return 'searchbox';
                    case 'hidden': return null;
                    default: return 'textbox';
                }
            default:
                if (el.isContentEditable) return 'textbox';
                if (el.hasAttribute('aria-live') && attr(el, 'aria-live') !== 'off') return 'status';
                return null;
        }
    };

    const roleOf = (el) => {
        const explicit = clean(attr(el, 'role')).split(' ')[0];
        return explicit || implicitRole(el);
    };

    const referencedText = (el, name) => {
        const ids = clean(attr(el, name));
        if (!ids) return '';
        return clean(ids.split(' ')
            .map((id) => document.getElementById(id))
            .filter(Boolean)
            .map(textOf)
            .join(' '));
    };

    const nameOf = (el, role) => {
        const tag = el.tagName.toLowerCase();
        const type = (attr(el, 'type') || '').toLowerCase();

        const labelledBy = referencedText(el, 'aria-labelledby');
        if (labelledBy) return labelledBy;

        const ariaLabel = clean(attr(el, 'aria-label'));
        if (ariaLabel) return ariaLabel;

        let labels = el.labels ? Array.from(el.labels) : [];
        if (!labels.length) {
            const wrapping = el.closest('label');
            if (wrapping) labels = [wrapping];
        }
        const labelText = clean(labels.map(textOf).join(' '));
        if (labelText) return labelText;

        if (tag === 'img' || (tag === 'input' && type === 'image')) {
            const alt = clean(attr(el, 'alt'));
            if (alt) return alt;
        }

        const title = clean(attr(el, 'title'));
        if (title) return title;

        if (tag === 'textarea' || (tag === 'input' && textInputTypes.has(type))) {
            const placeholder = clean(attr(el, 'placeholder'));
            if (placeholder) return placeholder;
        }

        if (textRoles.has(role)) {
            const text = textOf(el);
            if (text) return text;
        }

        if (tag === 'input' && (type === 'submit' || type === 'reset' || type === 'button')) {
            const value = clean(attr(el, 'value'));
            if (value) return value;
        }

        return '';
    };

    const valueOf = (el) => {
        const tag = el.tagName.toLowerCase();
        const type = (attr(el, 'type') || 'text').toLowerCase();
        if (tag === 'input') {
            if (['checkbox', 'radio', 'button', 'submit', 'reset', 'image'].includes(type)) {
                return undefined;
            }
            if (type === 'password') {
                return el.value ? args.passwordMask : '';
            }
            return el.value;
        }
        if (tag === 'textarea') {
            return el.value;
        }
        if (tag === 'select') {
            const selected = Array.from(el.selectedOptions).map((o) => clean(o.label || o.text));
            return selected.length ? selected.join(', ') : undefined;
        }
        if (el.isContentEditable) {
            return clean(el.innerText);
        }
        if (el.hasAttribute('aria-valuetext')) {
            return clean(attr(el, 'aria-valuetext'));
        }
        if (el.hasAttribute('aria-valuenow')) {
            return clean(attr(el, 'aria-valuenow'));
        }
        return undefined;
    };

    const candidates = Array.from(root.querySelectorAll(args.candidateSelector));
    if (root !== document && root.matches(args.candidateSelector)) {
        candidates.unshift(root);
    }

    const elements = [];
    let next = 1;
    for (const el of candidates) {
        if (args.maxRefs !== null && args.maxRefs !== undefined && elements.length >= args.maxRefs) {
            break;
        }
        if (isHidden(el)) continue;

        const role = roleOf(el);
        if (!role) continue;

        const name = clip(nameOf(el, role), args.maxNameLength);
        const value = valueOf(el);
        if (!name && value === undefined) continue;

        const ref = 'r' + next++;
        el.setAttribute(marker, ref);

        const entry = { ref, tagName: el.tagName.toLowerCase(), role, name };
        if (value !== undefined) entry.value = value;
        if (el.disabled === true || attr(el, 'aria-disabled') === 'true') entry.disabled = true;

        const tag = entry.tagName;
        const type = (attr(el, 'type') || '').toLowerCase();
        if (tag === 'input' && (type === 'checkbox' || type === 'radio')) {
            entry.checked = el.checked;
        } else if (el.hasAttribute('aria-checked')) {
            entry.checked = attr(el, 'aria-checked') === 'true';
        }
        if (el.hasAttribute('aria-expanded')) {
            entry.expanded = attr(el, 'aria-expanded') === 'true';
        }
        if (tag === 'select') {
            entry.options = Array.from(el.options).map((o) => clean(o.label || o.text));
        }

        const description = clip(
            referencedText(el, 'aria-describedby') || attr(el, 'aria-description') || '',
            args.maxDescriptionLength
        );
        if (description) entry.description = description;

        elements.push(entry);
    }

    return { scopeFound: true, elements };
}
"#;
