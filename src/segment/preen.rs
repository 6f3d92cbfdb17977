/*!
 * Core-text preening.
 *
 * Given one segment (text plus inline placeholder tags), find the minimal
 * translatable span and mark it with the core marker pair. Leading and
 * trailing extended whitespace always stays outside; edge tags stay outside
 * only when moving them does not split a Begin/End pair across the marker.
 *
 * Removing the markers from the result always gives back the input, and
 * preening never fails: in the worst case the whole middle is the core.
 */

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::BoundaryMode;
use super::classify::{EdgeContext, TagVerdict, classify_prefix_tag, classify_suffix_tag};
use super::tags::{
    CORE_END, CORE_START, InlineTag, find_inline_tags, is_core_marked, leading_tag, split_core,
    strip_inline_tags, trailing_tag,
};

/// Whitespace-like character entities at the start of a string
static SPACE_ENTITY_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:&nbsp;|&#160;|&#[xX][aA]0;|&bull;|&#8226;|&#[xX]2022;)")
        .expect("Invalid space entity regex")
});

/// Whitespace-like character entities at the end of a string
static SPACE_ENTITY_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:&nbsp;|&#160;|&#[xX][aA]0;|&bull;|&#8226;|&#[xX]2022;)$")
        .expect("Invalid space entity regex")
});

/// Escaped HTML tags (`&lt;br/&gt;`) at the start of a string
static ENTITY_TAG_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&lt;/?[A-Za-z][^&]*?&gt;").expect("Invalid entity tag regex")
});

/// Escaped HTML tags at the end of a string
static ENTITY_TAG_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&lt;/?[A-Za-z][^&]*?&gt;$").expect("Invalid entity tag regex")
});

/// Whether a character counts as extended whitespace
pub fn is_extended_space(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '\u{00A0}'
                | '\u{2007}'
                | '\u{202F}'
                | '\u{FEFF}'
                | '\u{2022}'
                | '\u{2023}'
                | '\u{2043}'
                | '\u{25AA}'
                | '\u{25CF}'
                | '\u{25E6}'
                | '\u{00B7}'
                | '_'
        )
}

/// Preening options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreenOptions {
    /// Treat escaped HTML tags such as `&lt;br&gt;` as whitespace
    #[serde(default)]
    pub html_entity_tags: bool,
}

/// A segment split into prefix, translatable core and suffix.
///
/// `prefix + core + suffix` is always the original segment text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreMarkedSegment {
    pub prefix: String,
    pub core: String,
    pub suffix: String,
}

impl CoreMarkedSegment {
    fn untranslatable(text: &str) -> Self {
        Self {
            prefix: text.to_string(),
            core: String::new(),
            suffix: String::new(),
        }
    }

    /// Whether the segment has translatable content
    pub fn has_core(&self) -> bool {
        !self.core.is_empty()
    }

    /// Text with the core marker pair, or plain text when there is no core
    pub fn to_marked_string(&self) -> String {
        if !self.has_core() {
            return self.to_plain_string();
        }
        let mut out = String::with_capacity(
            self.prefix.len() + self.core.len() + self.suffix.len() + CORE_START.len() + CORE_END.len(),
        );
        out.push_str(&self.prefix);
        out.push_str(CORE_START);
        out.push_str(&self.core);
        out.push_str(CORE_END);
        out.push_str(&self.suffix);
        out
    }

    /// Original segment text
    pub fn to_plain_string(&self) -> String {
        format!("{}{}{}", self.prefix, self.core, self.suffix)
    }
}

/// An edge tag peeled off the middle, with its adjacent whitespace
#[derive(Debug, Clone)]
struct EdgeEntry {
    tag: InlineTag,
    /// Start of the entry (tag, or whitespace before a suffix tag)
    start: usize,
    /// End of the entry (whitespace after a prefix tag, or the tag)
    end: usize,
}

/// Core-text preener
#[derive(Debug, Clone, Default)]
pub struct Preener {
    options: PreenOptions,
}

impl Preener {
    /// Create a preener with the given options
    pub fn new(options: PreenOptions) -> Self {
        Self { options }
    }

    /// Byte length of the extended whitespace run at the start of `text`
    pub fn leading_space_len(&self, text: &str) -> usize {
        let mut pos = 0;
        loop {
            let rest = &text[pos..];
            match rest.chars().next() {
                Some(c) if is_extended_space(c) => {
                    pos += c.len_utf8();
                    continue;
                }
                Some('&') => {
                    if let Some(m) = SPACE_ENTITY_START.find(rest) {
                        pos += m.end();
                        continue;
                    }
                    if self.options.html_entity_tags {
                        if let Some(m) = ENTITY_TAG_START.find(rest) {
                            pos += m.end();
                            continue;
                        }
                    }
                }
                _ => {}
            }
            return pos;
        }
    }

    /// Byte length of the extended whitespace run at the end of `text`
    pub fn trailing_space_len(&self, text: &str) -> usize {
        let mut end = text.len();
        loop {
            let rest = &text[..end];
            match rest.chars().next_back() {
                Some(c) if is_extended_space(c) => {
                    end -= c.len_utf8();
                    continue;
                }
                Some(';') => {
                    if let Some(m) = SPACE_ENTITY_END.find(rest) {
                        end = m.start();
                        continue;
                    }
                    if self.options.html_entity_tags {
                        if let Some(m) = ENTITY_TAG_END.find(rest) {
                            end = m.start();
                            continue;
                        }
                    }
                }
                _ => {}
            }
            return text.len() - end;
        }
    }

    /// Whether `text` holds anything besides extended whitespace and tags
    pub fn has_translatable_text(&self, text: &str) -> bool {
        let plain = strip_inline_tags(text);
        self.leading_space_len(&plain) < plain.len()
    }

    /// Compute the core of one segment
    pub fn preen(&self, segment: &str, mode: BoundaryMode) -> CoreMarkedSegment {
        if is_core_marked(segment) {
            if let Some((prefix, core, suffix)) = split_core(segment) {
                return CoreMarkedSegment {
                    prefix: prefix.to_string(),
                    core: core.to_string(),
                    suffix: suffix.to_string(),
                };
            }
        }

        let lead = self.leading_space_len(segment);
        if lead == segment.len() {
            return CoreMarkedSegment::untranslatable(segment);
        }
        let trail = self.trailing_space_len(&segment[lead..]);

        let mut lo = lead;
        let mut hi = segment.len() - trail;
        let mut prefix: Vec<EdgeEntry> = Vec::new();
        // peel order: outermost first
        let mut suffix: Vec<EdgeEntry> = Vec::new();

        loop {
            let mut peeled = false;

            if lo < hi {
                if let Some(tag) = leading_tag(&segment[lo..hi]) {
                    let tag_end = lo + tag.len();
                    let space = self.leading_space_len(&segment[tag_end..hi]);
                    prefix.push(EdgeEntry {
                        tag: shifted(tag, lo),
                        start: lo,
                        end: tag_end + space,
                    });
                    lo = tag_end + space;
                    peeled = true;
                }
            }

            if lo < hi {
                if let Some(tag) = trailing_tag(&segment[lo..hi]) {
                    let tag_start = lo + tag.start;
                    let space = self.trailing_space_len(&segment[lo..tag_start]);
                    suffix.push(EdgeEntry {
                        tag: shifted(tag, lo),
                        start: tag_start - space,
                        end: hi,
                    });
                    hi = tag_start - space;
                    peeled = true;
                }
            }

            if !peeled {
                break;
            }
        }

        let middle = &segment[lo..hi.max(lo)];
        if middle.is_empty() || !self.has_translatable_text(middle) {
            return CoreMarkedSegment::untranslatable(segment);
        }

        // string order from here on
        suffix.reverse();
        let prefix_tags: Vec<InlineTag> = prefix.iter().map(|e| e.tag.clone()).collect();
        let suffix_tags: Vec<InlineTag> = suffix.iter().map(|e| e.tag.clone()).collect();
        let core_tags = find_inline_tags(middle);
        let ctx = EdgeContext {
            prefix: &prefix_tags,
            suffix: &suffix_tags,
            core: &core_tags,
            mode,
        };

        let mut prefix_out: Vec<bool> = (0..prefix_tags.len())
            .map(|i| classify_prefix_tag(i, &ctx) == TagVerdict::OutsideCore)
            .collect();
        let mut suffix_out: Vec<bool> = (0..suffix_tags.len())
            .map(|i| classify_suffix_tag(i, &ctx) == TagVerdict::OutsideCore)
            .collect();

        settle_outside_runs(&prefix_tags, &suffix_tags, &mut prefix_out, &mut suffix_out);

        let outside_prefix = prefix_out.iter().take_while(|out| **out).count();
        let outside_suffix = suffix_out.iter().rev().take_while(|out| **out).count();

        let core_start = if outside_prefix == 0 {
            lead
        } else {
            prefix[outside_prefix - 1].end
        };
        let core_end = if outside_suffix == 0 {
            segment.len() - trail
        } else {
            suffix[suffix.len() - outside_suffix].start
        };

        trace!(
            "Preened segment: {} prefix tags ({} outside), {} suffix tags ({} outside)",
            prefix.len(),
            outside_prefix,
            suffix.len(),
            outside_suffix
        );

        CoreMarkedSegment {
            prefix: segment[..core_start].to_string(),
            core: segment[core_start..core_end].to_string(),
            suffix: segment[core_end..].to_string(),
        }
    }
}

fn shifted(mut tag: InlineTag, offset: usize) -> InlineTag {
    tag.start += offset;
    tag.end += offset;
    tag
}

/// Make the outside-core sets contiguous and pair-consistent.
///
/// Outside tags must form the outermost run on each side, and both halves of
/// an edge pair must land on the same side of the markers. Tags only ever
/// move inward, so this reaches a fixpoint.
fn settle_outside_runs(
    prefix: &[InlineTag],
    suffix: &[InlineTag],
    prefix_out: &mut [bool],
    suffix_out: &mut [bool],
) {
    let edge: Vec<&InlineTag> = prefix.iter().chain(suffix.iter()).collect();
    let mut pairs = Vec::new();
    for i in 0..edge.len() {
        for j in i + 1..edge.len() {
            if edge[i].pairs_with(edge[j]) {
                pairs.push((i, j));
            }
        }
    }

    loop {
        let mut changed = false;

        let mut inside_seen = false;
        for out in prefix_out.iter_mut() {
            if inside_seen && *out {
                *out = false;
                changed = true;
            }
            if !*out {
                inside_seen = true;
            }
        }

        inside_seen = false;
        for out in suffix_out.iter_mut().rev() {
            if inside_seen && *out {
                *out = false;
                changed = true;
            }
            if !*out {
                inside_seen = true;
            }
        }

        for &(i, j) in &pairs {
            let a = flag(prefix_out, suffix_out, i);
            let b = flag(prefix_out, suffix_out, j);
            if a != b {
                set_inside(prefix_out, suffix_out, i);
                set_inside(prefix_out, suffix_out, j);
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }
}

fn flag(prefix_out: &[bool], suffix_out: &[bool], index: usize) -> bool {
    if index < prefix_out.len() {
        prefix_out[index]
    } else {
        suffix_out[index - prefix_out.len()]
    }
}

fn set_inside(prefix_out: &mut [bool], suffix_out: &mut [bool], index: usize) {
    if index < prefix_out.len() {
        prefix_out[index] = false;
    } else {
        suffix_out[index - prefix_out.len()] = false;
    }
}
