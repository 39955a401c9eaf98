//! Fixed tables shared by the in-page classifier and the static HTML
//! classifier: which elements are candidates, how roles are derived from
//! tags, and which roles may take their name from text content.

/// Elements a caller can act on.
pub const INTERACTIVE_SELECTORS: &[&str] = &[
    "a[href]",
    "button",
    "input:not([type='hidden'])",
    "textarea",
    "select",
    "[role='button']",
    "[role='link']",
    "[role='checkbox']",
    "[role='radio']",
    "[role='switch']",
    "[role='tab']",
    "[role='menuitem']",
    "[role='menuitemcheckbox']",
    "[role='menuitemradio']",
    "[role='option']",
    "[role='slider']",
    "[role='spinbutton']",
    "[role='combobox']",
    "[role='listbox']",
    "[role='textbox']",
    "[role='searchbox']",
    "[contenteditable='true']",
    "[contenteditable='']",
];

/// Elements that carry meaning for orientation without being actionable.
pub const MEANINGFUL_SELECTORS: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "[role='heading']",
    "[role='alert']",
    "[role='status']",
    "[role='dialog']",
    "[role='alertdialog']",
    "img[alt]",
    "[aria-live]",
];

/// Roles whose accessible name may come from the element's own text.
pub const TEXT_ROLES: &[&str] = &[
    "button", "link", "tab", "menuitem", "heading", "option", "alert", "status",
];

/// Shown in place of a password field's value.
pub const PASSWORD_MASK: &str = "••••••••";

pub fn candidate_selector() -> String {
    INTERACTIVE_SELECTORS
        .iter()
        .chain(MEANINGFUL_SELECTORS.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn is_text_role(role: &str) -> bool {
    TEXT_ROLES.contains(&role)
}

/// Role implied by tag and attributes when no explicit `role` is set.
/// `attr` returns an attribute's value when the element carries it.
pub fn implicit_role<'a>(
    tag: &str,
    attr: impl Fn(&str) -> Option<&'a str>,
) -> Option<&'static str> {
    let role = match tag {
        "a" | "area" => {
            if attr("href").is_some() {
                "link"
            } else {
                return None;
            }
        }
        "button" => "button",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        "img" => {
            if attr("alt").is_some_and(|alt| !alt.trim().is_empty()) {
                "img"
            } else {
                return None;
            }
        }
        "textarea" => "textbox",
        "select" => {
            if attr("multiple").is_some() {
                "listbox"
            } else {
                "combobox"
            }
        }
        "option" => "option",
        "dialog" => "dialog",
        "input" => {
            let input_type = attr("type").unwrap_or("text").to_ascii_lowercase();
            match input_type.as_str() {
                "button" | "submit" | "reset" | "image" => "button",
                "checkbox" => "checkbox",
                "radio" => "radio",
                "range" => "slider",
                "number" => "spinbutton",
                "search" => "searchbox",
                "hidden" => return None,
                _ => "textbox",
            }
        }
        _ => {
            if matches!(attr("contenteditable"), Some("") | Some("true")) {
                "textbox"
            } else if attr("aria-live").is_some_and(|live| live != "off") {
                "status"
            } else {
                return None;
            }
        }
    };
    Some(role)
}
