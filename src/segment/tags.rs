/*!
 * Inline placeholder tags and core markers.
 *
 * Segment text carries native inline markup as XLIFF-style placeholder
 * tags: `<x id='n'/>` for self-contained markup, and `<bx id='n' rid='r'/>`
 * / `<ex id='n' rid='r'/>` for the open and close halves of a paired span.
 * The translatable core of a segment is wrapped in one marker pair.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Opening core marker
pub const CORE_START: &str = "<mrk mtype=\"x-coretext\">";

/// Closing core marker
pub const CORE_END: &str = "</mrk>";

/// Inline placeholder tag regex (`x`, `bx`, `ex`, always self-closing)
static INLINE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(x|bx|ex)((?:\s+[A-Za-z_:][-A-Za-z0-9_:.]*\s*=\s*(?:'[^']*'|"[^"]*"))*)\s*/>"#)
        .expect("Invalid inline tag regex")
});

/// Attribute regex for inline tags
static ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:'([^']*)'|"([^"]*)")"#)
        .expect("Invalid attribute regex")
});

/// Anything that looks like a tag
static TAG_LIKE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?[A-Za-z][^<>]*>").expect("Invalid tag-like regex")
});

/// The three inline placeholder kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Self-contained markup (`x`)
    Singleton,
    /// Opening half of a pair (`bx`)
    Begin,
    /// Closing half of a pair (`ex`)
    End,
}

impl TagKind {
    /// Element name used in segment text
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::Singleton => "x",
            Self::Begin => "bx",
            Self::End => "ex",
        }
    }

    fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Self::Singleton),
            "bx" => Some(Self::Begin),
            "ex" => Some(Self::End),
            _ => None,
        }
    }
}

/// An inline placeholder tag located in segment text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineTag {
    /// Placeholder kind
    pub kind: TagKind,
    /// Format registry id
    pub id: Option<u32>,
    /// Pairing id shared by a Begin and its End
    pub rid: Option<u32>,
    /// Semantic hint (`bold`, `link`, ...)
    pub ctype: Option<String>,
    /// Byte offset of `<`
    pub start: usize,
    /// Byte offset just past `/>`
    pub end: usize,
}

impl InlineTag {
    fn from_captures(caps: &regex::Captures<'_>) -> Option<Self> {
        let whole = caps.get(0)?;
        let kind = TagKind::from_element_name(caps.get(1)?.as_str())?;
        let mut tag = InlineTag {
            kind,
            id: None,
            rid: None,
            ctype: None,
            start: whole.start(),
            end: whole.end(),
        };

        if let Some(attrs) = caps.get(2) {
            for attr in ATTRIBUTE_REGEX.captures_iter(attrs.as_str()) {
                let name = attr.get(1).map_or("", |m| m.as_str());
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map_or("", |m| m.as_str());
                match name {
                    "id" => tag.id = value.parse().ok(),
                    "rid" => tag.rid = value.parse().ok(),
                    "ctype" => tag.ctype = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        Some(tag)
    }

    /// Render a placeholder tag the way the emitter writes it
    pub fn render(kind: TagKind, id: u32, rid: Option<u32>, ctype: Option<&str>) -> String {
        let mut out = format!("<{} id='{}'", kind.element_name(), id);
        if let Some(rid) = rid {
            out.push_str(&format!(" rid='{}'", rid));
        }
        if let Some(ctype) = ctype {
            out.push_str(&format!(" ctype='{}'", ctype));
        }
        out.push_str("/>");
        out
    }

    /// Length of the tag text in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the tag text is empty (never true for a parsed tag)
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Whether `other` is the pairing partner of this tag
    pub fn pairs_with(&self, other: &InlineTag) -> bool {
        match (self.kind, other.kind, self.rid, other.rid) {
            (TagKind::Begin, TagKind::End, Some(a), Some(b))
            | (TagKind::End, TagKind::Begin, Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// All inline placeholder tags of `text`, in order
pub fn find_inline_tags(text: &str) -> Vec<InlineTag> {
    INLINE_TAG_REGEX
        .captures_iter(text)
        .filter_map(|caps| InlineTag::from_captures(&caps))
        .collect()
}

/// The inline tag that starts exactly at the beginning of `text`
pub fn leading_tag(text: &str) -> Option<InlineTag> {
    if !text.starts_with('<') {
        return None;
    }
    INLINE_TAG_REGEX
        .captures(text)
        .and_then(|caps| InlineTag::from_captures(&caps))
        .filter(|tag| tag.start == 0)
}

/// The inline tag that ends exactly at the end of `text`
pub fn trailing_tag(text: &str) -> Option<InlineTag> {
    if !text.ends_with("/>") {
        return None;
    }
    find_inline_tags(text)
        .pop()
        .filter(|tag| tag.end == text.len())
}

/// Whether the text already carries a core marker pair
pub fn is_core_marked(text: &str) -> bool {
    text.contains(CORE_START)
}

/// Split marked text into (prefix, core, suffix)
pub fn split_core(text: &str) -> Option<(&str, &str, &str)> {
    let start = text.find(CORE_START)?;
    let core_start = start + CORE_START.len();
    let core_len = text[core_start..].find(CORE_END)?;
    let core_end = core_start + core_len;
    Some((
        &text[..start],
        &text[core_start..core_end],
        &text[core_end + CORE_END.len()..],
    ))
}

/// Remove the core marker pair, leaving everything else untouched
pub fn unmark(text: &str) -> String {
    match split_core(text) {
        Some((prefix, core, suffix)) => {
            let mut out = String::with_capacity(text.len());
            out.push_str(prefix);
            out.push_str(core);
            out.push_str(suffix);
            out
        }
        None => text.to_string(),
    }
}

/// Remove core markers and every inline placeholder tag
pub fn strip_inline_tags(text: &str) -> String {
    INLINE_TAG_REGEX.replace_all(&unmark(text), "").into_owned()
}

/// Text with every tag removed: core markers, placeholders and stray markup
pub fn plain_text(text: &str) -> String {
    TAG_LIKE_REGEX.replace_all(text, "").into_owned()
}

/// Tag-like substrings that are not inline placeholders or core markers
pub fn foreign_tags(text: &str) -> Vec<String> {
    let unmarked = unmark(text);
    TAG_LIKE_REGEX
        .find_iter(&unmarked)
        .map(|m| m.as_str())
        .filter(|tag| {
            !INLINE_TAG_REGEX
                .find(tag)
                .is_some_and(|m| m.start() == 0 && m.end() == tag.len())
        })
        .map(str::to_string)
        .collect()
}
