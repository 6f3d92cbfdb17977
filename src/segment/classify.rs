/*!
 * Tag classification.
 *
 * One verdict type serves both places where the pipeline has to decide what
 * a tag "is": the preener deciding whether an edge tag belongs inside the
 * translatable core, and the skeleton merger deciding whether a structural
 * event reported by a lenient parser has a literal counterpart.
 */

use std::borrow::Cow;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::BoundaryMode;
use super::tags::{InlineTag, TagKind};

/// Comments, CDATA sections and script or style bodies; an unterminated one
/// runs to the end of the span
static OPAQUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<!--.*?(?:-->|\z)|<!\[CDATA\[.*?(?:\]\]>|\z)|<script(?:\s(?:[^>]*[^/>])?)?>.*?(?:</script|\z)|<style(?:\s(?:[^>]*[^/>])?)?>.*?(?:</style|\z)",
    )
    .expect("Invalid opaque regex")
});

/// Native tag name regex (open or close)
static NATIVE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<\s*/?\s*([A-Za-z][A-Za-z0-9:_-]*)").expect("Invalid native tag regex")
});

/// Classification result for a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagVerdict {
    /// Edge tag that stays outside the translatable core
    OutsideCore,
    /// Edge tag that must stay inside the core with its partner
    InsideCore,
    /// Structural event with no literal counterpart at this position
    Phantom,
    /// No evidence either way
    Unresolved,
}

/// Edge tags of one segment, all in string order.
///
/// `prefix` runs from the outermost tag inward, `suffix` from the tag
/// closest to the core outward.
pub struct EdgeContext<'a> {
    pub prefix: &'a [InlineTag],
    pub suffix: &'a [InlineTag],
    pub core: &'a [InlineTag],
    pub mode: BoundaryMode,
}

impl EdgeContext<'_> {
    fn core_has(&self, kind: TagKind, rid: u32) -> bool {
        // first match wins; later duplicates of the rid are never consulted
        self.core
            .iter()
            .find(|tag| tag.rid == Some(rid))
            .is_some_and(|tag| tag.kind == kind)
    }

    fn remnant(&self) -> TagVerdict {
        match self.mode {
            BoundaryMode::Sentence => TagVerdict::OutsideCore,
            BoundaryMode::Paragraph => TagVerdict::Unresolved,
        }
    }
}

/// Classify the prefix tag at `index`
pub fn classify_prefix_tag(index: usize, ctx: &EdgeContext<'_>) -> TagVerdict {
    let tag = &ctx.prefix[index];
    let Some(rid) = tag.rid else {
        return match tag.kind {
            TagKind::Singleton => TagVerdict::OutsideCore,
            _ => TagVerdict::Unresolved,
        };
    };

    match tag.kind {
        TagKind::Singleton => TagVerdict::OutsideCore,
        TagKind::Begin => {
            let brackets_core = ctx
                .suffix
                .iter()
                .any(|other| other.kind == TagKind::End && other.rid == Some(rid));
            let empty_pair = ctx.prefix[index + 1..]
                .iter()
                .any(|other| other.kind == TagKind::End && other.rid == Some(rid));
            if brackets_core || empty_pair {
                TagVerdict::OutsideCore
            } else if ctx.core_has(TagKind::End, rid) {
                TagVerdict::InsideCore
            } else {
                ctx.remnant()
            }
        }
        TagKind::End => {
            let empty_pair = ctx.prefix[..index]
                .iter()
                .any(|other| other.kind == TagKind::Begin && other.rid == Some(rid));
            if empty_pair {
                TagVerdict::OutsideCore
            } else {
                ctx.remnant()
            }
        }
    }
}

/// Classify the suffix tag at `index`
pub fn classify_suffix_tag(index: usize, ctx: &EdgeContext<'_>) -> TagVerdict {
    let tag = &ctx.suffix[index];
    let Some(rid) = tag.rid else {
        return match tag.kind {
            TagKind::Singleton => TagVerdict::OutsideCore,
            _ => TagVerdict::Unresolved,
        };
    };

    match tag.kind {
        TagKind::Singleton => TagVerdict::OutsideCore,
        TagKind::End => {
            let brackets_core = ctx
                .prefix
                .iter()
                .any(|other| other.kind == TagKind::Begin && other.rid == Some(rid));
            let empty_pair = ctx.suffix[..index]
                .iter()
                .any(|other| other.kind == TagKind::Begin && other.rid == Some(rid));
            if brackets_core || empty_pair {
                TagVerdict::OutsideCore
            } else if ctx.core_has(TagKind::Begin, rid) {
                TagVerdict::InsideCore
            } else {
                ctx.remnant()
            }
        }
        TagKind::Begin => {
            let empty_pair = ctx.suffix[index + 1..]
                .iter()
                .any(|other| other.kind == TagKind::End && other.rid == Some(rid));
            if empty_pair {
                TagVerdict::OutsideCore
            } else {
                ctx.remnant()
            }
        }
    }
}

/// `span` minus everything whose tag-like text the tokenizer never reads
fn without_opaque(span: &str) -> Cow<'_, str> {
    if span.contains("<!") || span.contains("<s") || span.contains("<S") {
        OPAQUE_REGEX.replace_all(span, "")
    } else {
        Cow::Borrowed(span)
    }
}

/// Whether `span` holds an end tag for an element it never opened
fn has_unmatched_close(span: &str) -> bool {
    let mut open: Vec<String> = Vec::new();
    for caps in NATIVE_TAG_REGEX.captures_iter(span) {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let name = caps.get(1).map_or_else(String::new, |m| m.as_str().to_ascii_lowercase());
        if !whole.contains('/') {
            open.push(name);
            continue;
        }
        match open.iter().rposition(|opened| *opened == name) {
            Some(index) => open.truncate(index),
            None => return true,
        }
    }
    false
}

/// Decide whether a close tag is phantom, given the span that consuming it
/// would delete. Any TU-break tag in that span means the parser closed the
/// element early and the literal close belongs to a later element.
pub fn classify_close_span(doomed: &str, break_tags: &HashSet<String>) -> TagVerdict {
    let span = without_opaque(doomed);
    let breaks = NATIVE_TAG_REGEX
        .captures_iter(&span)
        .filter_map(|caps| caps.get(1))
        .any(|name| break_tags.contains(&name.as_str().to_ascii_lowercase()));
    if breaks {
        TagVerdict::Phantom
    } else {
        TagVerdict::Unresolved
    }
}

/// [`classify_close_span`] for a close the parser implied rather than read.
///
/// An end tag in the doomed span that the span never opened is reported
/// after this close, so the literal close belongs to a later element.
pub fn classify_implied_close_span(doomed: &str, break_tags: &HashSet<String>) -> TagVerdict {
    if classify_close_span(doomed, break_tags) == TagVerdict::Phantom
        || has_unmatched_close(&without_opaque(doomed))
    {
        TagVerdict::Phantom
    } else {
        TagVerdict::Unresolved
    }
}

/// Decide whether an open tag is phantom, given the span between the cursor
/// and its first literal occurrence. A literal close of the same element in
/// that span means the parser invented the open.
pub fn classify_open_span(ahead: &str, name: &str) -> TagVerdict {
    let span = without_opaque(ahead);
    let closes = NATIVE_TAG_REGEX.captures_iter(&span).any(|caps| {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let tag_name = caps.get(1).map_or("", |m| m.as_str());
        whole.contains('/') && tag_name.eq_ignore_ascii_case(name)
    });
    if closes {
        TagVerdict::Phantom
    } else {
        TagVerdict::Unresolved
    }
}
