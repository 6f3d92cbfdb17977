/*!
 * Error-correcting HTML/XHTML tokenizer.
 *
 * Payloads are kept raw. Implied end tags are synthesized the way browsers
 * close `p`, list items, table cells and options, and every element still
 * open at the end of input is closed. An end tag with nothing to close is
 * still reported, so its bytes are never lost.
 */

use std::collections::HashSet;

use log::debug;
use once_cell::sync::Lazy;

use super::{Attribute, SourcePos, Token, TokenProducer, tag_end};
use crate::errors::ConversionError;

static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

/// Start tags that close an open `p`
static CLOSES_PARAGRAPH: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
        "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
        "header", "hr", "li", "main", "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
    ]
    .into_iter()
    .collect()
});

/// Elements an implied close never reaches past
static SCOPE_BOUNDARIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
    ]
    .into_iter()
    .collect()
});

/// Lenient producer for HTML and XHTML sources
#[derive(Debug, Clone)]
pub struct LenientHtmlProducer {
    raw_text_elements: HashSet<String>,
}

impl Default for LenientHtmlProducer {
    fn default() -> Self {
        Self::new(["script", "style"])
    }
}

impl LenientHtmlProducer {
    /// `raw_text_elements` hold unparsed content up to their end tag
    pub fn new<I, S>(raw_text_elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            raw_text_elements: raw_text_elements
                .into_iter()
                .map(|name| name.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl TokenProducer for LenientHtmlProducer {
    fn produce(&mut self, source: &str) -> Result<Vec<Token>, ConversionError> {
        let mut run = Run {
            source,
            raw_text_elements: &self.raw_text_elements,
            tokens: Vec::new(),
            open: Vec::new(),
            tracker: PositionTracker::default(),
        };
        run.tokenize();
        run.pop_to(0);
        Ok(run.tokens)
    }
}

/// Line and column of monotonically increasing offsets
#[derive(Debug)]
struct PositionTracker {
    offset: usize,
    line: u32,
    column: u32,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self { offset: 0, line: 1, column: 1 }
    }
}

impl PositionTracker {
    fn at(&mut self, source: &str, offset: usize) -> SourcePos {
        for c in source[self.offset..offset].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset = offset;
        SourcePos { line: self.line, column: self.column }
    }
}

struct Run<'a> {
    source: &'a str,
    raw_text_elements: &'a HashSet<String>,
    tokens: Vec<Token>,
    // @field: names of elements awaiting an end tag, outermost first
    open: Vec<String>,
    tracker: PositionTracker,
}

impl Run<'_> {
    fn tokenize(&mut self) {
        let source = self.source;
        let mut i = 0;
        while i < source.len() {
            let rest = &source[i..];
            let pos = Some(self.tracker.at(source, i));
            if rest.starts_with("<!--") {
                let end = rest[4..].find("-->").map_or(source.len(), |e| i + 4 + e + 3);
                self.tokens.push(Token::Comment { raw: source[i..end].to_string(), pos });
                i = end;
            } else if rest.starts_with("<![CDATA[") {
                let end = rest[9..].find("]]>").map_or(source.len(), |e| i + 9 + e + 3);
                self.tokens.push(Token::Cdata { raw: source[i..end].to_string(), pos });
                i = end;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                let end = rest.find('>').map_or(source.len(), |e| i + e + 1);
                self.tokens.push(Token::Declaration { raw: source[i..end].to_string(), pos });
                i = end;
            } else if is_tag_start(rest.as_bytes(), 2) && rest.starts_with("</") {
                let end = tag_end(source, i);
                let raw = &source[i..end];
                self.end_tag(element_name(&raw[2..]), raw, pos);
                i = end;
            } else if is_tag_start(rest.as_bytes(), 1) {
                let end = tag_end(source, i);
                let raw = &source[i..end];
                let (name, attributes, slash) = parse_start_tag(raw);
                let self_closing = slash || VOID_ELEMENTS.contains(name.as_str());
                self.start_tag(&name, attributes, self_closing, raw, pos);
                i = end;
                if !self_closing && self.raw_text_elements.contains(&name) {
                    let close = find_end_tag(source, i, &name).unwrap_or(source.len());
                    if close > i {
                        let pos = Some(self.tracker.at(source, i));
                        self.tokens.push(Token::Text { text: source[i..close].to_string(), pos });
                    }
                    i = close;
                }
            } else {
                let end = next_markup(source, i + 1);
                self.tokens.push(Token::Text { text: source[i..end].to_string(), pos });
                i = end;
            }
        }
    }

    fn start_tag(
        &mut self,
        name: &str,
        attributes: Vec<Attribute>,
        self_closing: bool,
        raw: &str,
        pos: Option<SourcePos>,
    ) {
        if CLOSES_PARAGRAPH.contains(name) {
            self.close_in_scope(&["p"], &[]);
        }
        match name {
            "li" => self.close_in_scope(&["li"], &["ul", "ol"]),
            "dt" | "dd" => self.close_in_scope(&["dt", "dd"], &["dl"]),
            "option" => self.close_in_scope(&["option"], &["select", "datalist", "optgroup"]),
            "optgroup" => self.close_in_scope(&["option", "optgroup"], &["select"]),
            "tr" => {
                self.close_in_scope(&["td", "th"], &["tr"]);
                self.close_in_scope(&["tr"], &["tbody", "thead", "tfoot"]);
            }
            "td" | "th" => self.close_in_scope(&["td", "th"], &["tr"]),
            _ => {}
        }
        self.tokens.push(Token::StartTag {
            name: name.to_string(),
            attributes,
            self_closing,
            raw: Some(raw.to_string()),
            pos,
        });
        if !self_closing {
            self.open.push(name.to_string());
        }
    }

    fn end_tag(&mut self, name: String, raw: &str, pos: Option<SourcePos>) {
        if let Some(index) = self.open.iter().rposition(|open| *open == name) {
            self.pop_to(index + 1);
            self.open.truncate(index);
        } else if name == "p" {
            debug!("Stray </p> at {}; opening an empty paragraph", display_pos(pos));
            self.tokens.push(Token::StartTag {
                name: name.clone(),
                attributes: Vec::new(),
                self_closing: false,
                raw: None,
                pos: None,
            });
        } else {
            // nothing to close; the tag still has to reach the skeleton
            debug!("Keeping unmatched </{}> at {} as a literal end tag", name, display_pos(pos));
        }
        self.tokens.push(Token::EndTag { name, raw: Some(raw.to_string()), pos });
    }

    /// Close the nearest open `targets` element unless a boundary comes first
    fn close_in_scope(&mut self, targets: &[&str], boundaries: &[&str]) {
        for index in (0..self.open.len()).rev() {
            let element = self.open[index].as_str();
            if targets.contains(&element) {
                self.pop_to(index);
                return;
            }
            if boundaries.contains(&element) || SCOPE_BOUNDARIES.contains(element) {
                return;
            }
        }
    }

    /// Synthesize end tags for every open element from `index` up
    fn pop_to(&mut self, index: usize) {
        let closed: Vec<String> = self.open.drain(index..).collect();
        for name in closed.into_iter().rev() {
            self.tokens.push(Token::EndTag { name, raw: None, pos: None });
        }
    }
}

fn display_pos(pos: Option<SourcePos>) -> String {
    pos.map_or_else(|| "?".to_string(), |pos| pos.to_string())
}

/// `<` (or `</` with `skip` 2) followed by a letter
fn is_tag_start(bytes: &[u8], skip: usize) -> bool {
    bytes.first() == Some(&b'<') && bytes.get(skip).is_some_and(|b| b.is_ascii_alphabetic())
}

/// Offset of the next `<` that opens markup, or the end of the source
fn next_markup(source: &str, from: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = from;
    while let Some(found) = source.get(i..).and_then(|rest| rest.find('<')) {
        let at = i + found;
        let rest = &bytes[at..];
        let opens = is_tag_start(rest, 1)
            || matches!(rest.get(1), Some(b'!') | Some(b'?'))
            || (rest.get(1) == Some(&b'/') && is_tag_start(rest, 2));
        if opens {
            return at;
        }
        i = at + 1;
    }
    source.len()
}

/// Lowercased name at the start of a tag body
fn element_name(body: &str) -> String {
    let end = body
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(body.len());
    body[..end].to_ascii_lowercase()
}

/// Start of `</name` (any case, followed by a delimiter) at or after `from`
fn find_end_tag(source: &str, from: usize, name: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = from;
    while let Some(found) = source.get(i..).and_then(|rest| rest.find("</")) {
        let at = i + found;
        let after = at + 2 + name.len();
        let matches_name = bytes
            .get(at + 2..after)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()));
        let delimited = bytes
            .get(after)
            .is_none_or(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/');
        if matches_name && delimited {
            return Some(at);
        }
        i = at + 2;
    }
    None
}

/// Name, attributes and trailing-slash flag of a start tag
fn parse_start_tag(raw: &str) -> (String, Vec<Attribute>, bool) {
    let bytes = raw.as_bytes();
    let body_end = if raw.ends_with('>') { raw.len() - 1 } else { raw.len() };
    let name = element_name(&raw[1..body_end]);
    let mut i = 1 + name.len();
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        while i < body_end && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= body_end {
            break;
        }
        if bytes[i] == b'/' {
            i += 1;
            self_closing = i == body_end;
            continue;
        }
        let name_start = i;
        while i < body_end && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' && bytes[i] != b'/' {
            i += 1;
        }
        if i == name_start {
            // stray '='
            i += 1;
            continue;
        }
        let attr_name = raw[name_start..i].to_ascii_lowercase();
        self_closing = false;

        let mut j = i;
        while j < body_end && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= body_end || bytes[j] != b'=' {
            attributes.push(Attribute { name: attr_name, value: None, value_span: None });
            continue;
        }
        j += 1;
        while j < body_end && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let span = match bytes.get(j) {
            Some(&quote) if j < body_end && (quote == b'"' || quote == b'\'') => {
                let start = j + 1;
                let end = raw[start..body_end]
                    .find(quote as char)
                    .map_or(body_end, |e| start + e);
                i = (end + 1).min(body_end);
                start..end
            }
            _ => {
                let start = j;
                let mut end = j;
                while end < body_end && !bytes[end].is_ascii_whitespace() {
                    end += 1;
                }
                i = end;
                start..end
            }
        };
        attributes.push(Attribute {
            name: attr_name,
            value: Some(raw[span.clone()].to_string()),
            value_span: Some(span),
        });
    }
    (name, attributes, self_closing)
}
