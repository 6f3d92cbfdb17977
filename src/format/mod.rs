/*!
 * Placeholders and the format table.
 *
 * The final skeleton and the format table refer to translation units and
 * format entries through textual placeholders (`%%%TU:n%%%`, `%%%FMT:n%%%`).
 * This module owns their syntax, the element-to-ctype hints written on
 * inline tags, and the registry that allocates format ids.
 */

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

pub mod registry;

pub use self::registry::{FormatRegistry, FormatTable};

/// Placeholder regex for both kinds
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%%%(TU|FMT):(\d+)%%%").expect("Invalid placeholder regex")
});

/// Semantic hints for common inline elements
static CTYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("b", "bold"),
        ("strong", "bold"),
        ("i", "italic"),
        ("em", "italic"),
        ("cite", "italic"),
        ("u", "underlined"),
        ("a", "link"),
        ("img", "image"),
        ("br", "lb"),
        ("wbr", "lb"),
        ("sub", "x-sub"),
        ("sup", "x-sup"),
        ("code", "x-code"),
        ("span", "x-span"),
        ("font", "x-font"),
    ])
});

/// A placeholder reference found in skeleton or format text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Translation unit reference
    Tu(u32),
    /// Format table reference
    Format(u32),
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tu(id) => write!(f, "%%%TU:{}%%%", id),
            Self::Format(id) => write!(f, "%%%FMT:{}%%%", id),
        }
    }
}

/// A placeholder and its byte range in the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMatch {
    pub placeholder: Placeholder,
    pub start: usize,
    pub end: usize,
}

/// All placeholders of `text`, in order
pub fn find_placeholders(text: &str) -> Vec<PlaceholderMatch> {
    PLACEHOLDER_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let id: u32 = caps.get(2)?.as_str().parse().ok()?;
            let placeholder = match caps.get(1)?.as_str() {
                "TU" => Placeholder::Tu(id),
                _ => Placeholder::Format(id),
            };
            Some(PlaceholderMatch {
                placeholder,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Whether `text` is exactly one placeholder
pub fn is_placeholder(text: &str) -> bool {
    PLACEHOLDER_REGEX
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

/// Remove every placeholder from `text`
pub fn strip_placeholders(text: &str) -> String {
    PLACEHOLDER_REGEX.replace_all(text, "").into_owned()
}

/// Semantic hint for an inline element, if it has one
pub fn ctype_for(element: &str) -> Option<&'static str> {
    CTYPES.get(element.to_ascii_lowercase().as_str()).copied()
}
