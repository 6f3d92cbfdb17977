/*!
 * Skeleton merging.
 *
 * A lenient parser reports events that are not always literally present in
 * the source: implied end tags, invented start tags, lowercased names. The
 * pseudo-skeleton it produces is replayed here against the literal source
 * bytes. Text the placeholders stand for is cut out, every other byte is
 * kept as is, and the result is the final skeleton.
 *
 * The cursor lives on a position stack. Element lines move it past the
 * next literal occurrence of their tag; placeholder lines insert at the
 * cursor or, right after an attribute line, into the located value.
 *
 * Tag searches never look inside comments, CDATA sections or the content of
 * raw-text elements such as `script`, because the tokenizer never reads
 * tags there either.
 */

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use encoding_rs::Encoding;
use log::{debug, trace, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::line::{PseudoSkeleton, SkeletonLine};
use super::stack::{PositionStack, remap_offset};
use crate::errors::ConversionError;
use crate::format::is_placeholder;
use crate::markup::{SourcePos, tag_end};
use crate::segment::TagVerdict;
use crate::segment::classify::{classify_close_span, classify_implied_close_span, classify_open_span};

/// Merge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Tags that cannot occur inside the element a close tag ends
    #[serde(default = "default_tu_break_tags")]
    pub tu_break_tags: Vec<String>,

    /// Real entries kept on the position stack after pruning
    #[serde(default = "default_stack_window")]
    pub stack_window: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            tu_break_tags: default_tu_break_tags(),
            stack_window: default_stack_window(),
        }
    }
}

fn default_tu_break_tags() -> Vec<String> {
    [
        "p", "div", "li", "ul", "ol", "dl", "dt", "dd", "table", "tr", "td", "th", "h1", "h2",
        "h3", "h4", "h5", "h6", "blockquote", "pre", "section", "article", "option",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_stack_window() -> usize {
    64
}

/// What the merge had to work around
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub phantom_opens: usize,
    pub phantom_closes: usize,
    pub missing_tags: usize,
    pub missing_attributes: usize,
    pub unterminated_comments: usize,
}

/// Final skeleton with the merge report
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub skeleton: String,
    pub report: MergeReport,
}

/// Reconciles pseudo-skeletons with literal source bytes
#[derive(Debug, Clone)]
pub struct SkeletonMerger {
    break_tags: HashSet<String>,
    stack_window: usize,
    // @field: start of a comment, a CDATA section or a raw-text element
    skip_opener: Option<Regex>,
}

impl SkeletonMerger {
    pub fn new(options: &MergeOptions) -> Self {
        Self {
            break_tags: options
                .tu_break_tags
                .iter()
                .map(|tag| tag.to_ascii_lowercase())
                .collect(),
            stack_window: options.stack_window.max(1),
            skip_opener: skip_opener(&["script", "style"]),
        }
    }

    /// Elements whose content is skipped like a comment, `script` and
    /// `style` unless set
    pub fn with_raw_text_elements<S: AsRef<str>>(mut self, elements: &[S]) -> Self {
        self.skip_opener = skip_opener(elements);
        self
    }

    /// Replay `pseudo` over `original` decoded with `encoding`.
    ///
    /// Only undecodable input is an error; unfound tags and attributes are
    /// logged and skipped.
    pub fn merge(
        &self,
        pseudo: &PseudoSkeleton,
        original: &[u8],
        encoding: &'static Encoding,
    ) -> Result<MergeOutcome, ConversionError> {
        let text = encoding
            .decode_without_bom_handling_and_without_replacement(original)
            .ok_or_else(|| {
                ConversionError::Encoding(format!("input is not valid {}", encoding.name()))
            })?;
        Ok(self.merge_str(pseudo, &text))
    }

    /// Replay `pseudo` over already decoded text
    pub fn merge_str(&self, pseudo: &PseudoSkeleton, original: &str) -> MergeOutcome {
        let mut state = MergeState::new(original, self);
        for line in pseudo.lines() {
            state.apply(line);
        }
        state.finish();
        debug!(
            "Merged {} skeleton lines: {} phantom opens, {} phantom closes, {} tags and {} attributes not found",
            pseudo.len(),
            state.report.phantom_opens,
            state.report.phantom_closes,
            state.report.missing_tags,
            state.report.missing_attributes
        );
        MergeOutcome {
            skeleton: state.buffer,
            report: state.report,
        }
    }
}

fn skip_opener<S: AsRef<str>>(raw_text_elements: &[S]) -> Option<Regex> {
    let names: Vec<String> = raw_text_elements
        .iter()
        .map(|name| name.as_ref().trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .map(|name| regex::escape(&name))
        .collect();
    let source = if names.is_empty() {
        r"<!--|<!\[CDATA\[".to_string()
    } else {
        format!(r"<!--|<!\[CDATA\[|(?i:<({})(?:[\s/>]|$))", names.join("|"))
    };
    match Regex::new(&source) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("Cannot search for comments and raw-text elements: {}", e);
            None
        }
    }
}

/// Skip regions in buffer order, indexed as far as lookups needed
#[derive(Debug, Default)]
struct SkipIndex {
    regions: Vec<Range<usize>>,
    // @field: every opener before this offset is indexed
    scanned_to: usize,
    complete: bool,
}

impl SkipIndex {
    /// Indexed region that ends after `pos`
    fn after(&self, pos: usize) -> Option<Range<usize>> {
        let index = self.regions.partition_point(|region| region.end <= pos);
        self.regions.get(index).cloned()
    }

    /// Keep offsets in step with `edit` replaced by `new_len` bytes
    fn remap(&mut self, edit: &Range<usize>, new_len: usize) {
        let first = self.regions.partition_point(|region| region.end <= edit.start);
        for region in &mut self.regions[first..] {
            *region = remap_offset(region.start, edit, new_len)..remap_offset(region.end, edit, new_len);
        }
        self.scanned_to = remap_offset(self.scanned_to, edit, new_len);
    }
}

/// Where the next placeholder goes
#[derive(Debug, Default)]
enum Pending {
    /// At the cursor
    #[default]
    Cursor,
    /// Into an attribute value
    Value(Range<usize>),
    /// Nowhere; the attribute was not found
    Skip,
}

struct MergeState<'a> {
    merger: &'a SkeletonMerger,
    buffer: String,
    stack: PositionStack,
    pending: Pending,
    // @field: a placeholder stands for the text since the last tag match
    covered: bool,
    // @field: forward attribute hits since the last tag match
    attr_run: usize,
    // @field: stack height before the first forward hit of the run
    run_base: Option<usize>,
    // @field: forward attribute searches start here
    forward_floor: usize,
    skips: SkipIndex,
    patterns: HashMap<String, Regex>,
    report: MergeReport,
}

impl<'a> MergeState<'a> {
    fn new(original: &str, merger: &'a SkeletonMerger) -> Self {
        Self {
            merger,
            buffer: original.to_string(),
            stack: PositionStack::new(),
            pending: Pending::Cursor,
            covered: false,
            attr_run: 0,
            run_base: None,
            forward_floor: 0,
            skips: SkipIndex::default(),
            patterns: HashMap::new(),
            report: MergeReport::default(),
        }
    }

    fn apply(&mut self, line: &SkeletonLine) {
        match line {
            SkeletonLine::Tu { .. } | SkeletonLine::Format { .. } => {
                let Some(placeholder) = line.placeholder() else {
                    return;
                };
                let text = placeholder.to_string();
                match std::mem::take(&mut self.pending) {
                    Pending::Cursor => self.insert_at_cursor(&text),
                    Pending::Value(range) => self.edit(range, &text),
                    Pending::Skip => debug!("Dropping {} for an attribute that was not found", text),
                }
            }
            SkeletonLine::Attribute { element, name, .. } => {
                self.pending = self.locate_attribute(element, name);
            }
            SkeletonLine::Open { name, pos, .. } => {
                self.pending = Pending::Cursor;
                self.match_element(name, false, *pos);
            }
            SkeletonLine::Close { name, pos, .. } => {
                self.pending = Pending::Cursor;
                self.match_element(name, true, *pos);
            }
        }
    }

    /// Replace `range` of the buffer and keep every tracked offset in step
    fn edit(&mut self, range: Range<usize>, replacement: &str) {
        let new_len = replacement.len();
        self.buffer.replace_range(range.clone(), replacement);
        self.stack.remap(|offset| remap_offset(offset, &range, new_len));
        self.forward_floor = remap_offset(self.forward_floor, &range, new_len);
        self.skips.remap(&range, new_len);
    }

    /// Drop trailing text that the last placeholders stand for
    fn finish(&mut self) {
        let cursor = self.stack.peek();
        if self.covered && cursor < self.buffer.len() {
            self.edit(cursor..self.buffer.len(), "");
        }
    }

    fn insert_at_cursor(&mut self, text: &str) {
        let cursor = self.stack.peek();
        self.edit(cursor..cursor, text);
        self.covered = true;
    }

    fn match_element(&mut self, name: &str, closing: bool, pos: Option<SourcePos>) {
        let cursor = self.stack.peek();
        let origin = pos.map_or_else(|| "synthesized".to_string(), |p| format!("at {}", p));

        let Some((tag_start, tag_end)) = self.find_tag(name, closing, cursor) else {
            self.report.missing_tags += 1;
            debug!(
                "No literal <{}{}> after offset {} ({})",
                if closing { "/" } else { "" },
                name,
                cursor,
                origin
            );
            return;
        };

        let span = self.visible(cursor..tag_start);
        let verdict = match (closing, pos) {
            (true, Some(_)) => classify_close_span(&span, &self.merger.break_tags),
            (true, None) => classify_implied_close_span(&span, &self.merger.break_tags),
            (false, _) => classify_open_span(&span, name),
        };
        if verdict == TagVerdict::Phantom {
            if closing {
                self.report.phantom_closes += 1;
            } else {
                self.report.phantom_opens += 1;
            }
            debug!(
                "Phantom <{}{}> ({}): literal tag at {} belongs to a later element",
                if closing { "/" } else { "" },
                name,
                origin,
                tag_start
            );
            return;
        }

        // the attribute run is over; its restore points are no longer needed
        if let Some(base) = self.run_base.take() {
            self.stack.truncate(base);
            self.attr_run = 0;
        }

        let mut tag_end = tag_end;
        if tag_start > cursor {
            if self.covered {
                let removed = tag_start - cursor;
                self.edit(cursor..tag_start, "");
                tag_end -= removed;
            } else {
                trace!("Keeping {} uncovered bytes before <{}>", tag_start - cursor, name);
            }
        }

        self.stack.push(tag_end);
        self.covered = false;
        if self.attr_run == 0 {
            self.stack.prune_to_height(self.merger.stack_window);
        }
    }

    fn locate_attribute(&mut self, element: &str, name: &str) -> Pending {
        let cursor = self.stack.peek();
        if let Some(range) = self.backward_value(element, name, cursor) {
            return Pending::Value(range);
        }

        let mut from = cursor.max(self.forward_floor);
        while let Some((start, end)) = self.find_tag(element, false, from) {
            if let Some(range) = self.value_in_tag(start..end, name) {
                if self.run_base.is_none() {
                    self.run_base = Some(self.stack.height());
                }
                self.stack.push(cursor);
                self.attr_run += 1;
                self.forward_floor = end;
                trace!("Attribute {}@{} found ahead at {}", name, element, start);
                return Pending::Value(range);
            }
            from = end;
        }

        self.report.missing_attributes += 1;
        warn!("Attribute '{}' of <{}> not found after offset {}", name, element, cursor);
        Pending::Skip
    }

    /// Value of `name` in the tag that ends at the cursor
    fn backward_value(&mut self, element: &str, name: &str, cursor: usize) -> Option<Range<usize>> {
        let before = &self.buffer[..cursor];
        if !before.ends_with('>') {
            return None;
        }
        let tag_start = before.rfind('<')?;
        let tag = &before[tag_start..];
        if !starts_with_element(&tag[1..], element) {
            return None;
        }
        self.value_in_tag(tag_start..cursor, name)
    }

    /// Usable value of `name` inside the tag at `tag`
    fn value_in_tag(&mut self, tag: Range<usize>, name: &str) -> Option<Range<usize>> {
        let pattern = self.pattern(&format!("attr:{}", name), || {
            format!(
                r#"(?i)\s{}\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#,
                regex::escape(name)
            )
        })?;
        let caps = pattern.captures(&self.buffer[tag.clone()])?;
        let value = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
        let text = value.as_str();
        if text.is_empty() || text.starts_with('$') || is_placeholder(text) || text.contains("%%%") {
            return None;
        }
        Some(tag.start + value.start()..tag.start + value.end())
    }

    fn tag_pattern(&mut self, name: &str, closing: bool) -> Option<Regex> {
        let key = format!("{}:{}", if closing { "close" } else { "open" }, name);
        self.pattern(&key, || {
            if closing {
                format!(r"(?i)</{}(?:[\s/>]|$)", regex::escape(name))
            } else {
                format!(r"(?i)<{}(?:[\s/>]|$)", regex::escape(name))
            }
        })
    }

    /// Next literal tag `name` at or after `from`, outside skip regions
    fn find_tag(&mut self, name: &str, closing: bool, from: usize) -> Option<(usize, usize)> {
        let pattern = self.tag_pattern(name, closing)?;

        let mut pos = from;
        loop {
            let found = pattern.find_at(&self.buffer, pos)?.start();
            if let Some(region) = self.next_skip(pos) {
                if region.start < found {
                    pos = region.end.max(pos + 1).min(self.buffer.len());
                    if region.end >= self.buffer.len() {
                        return None;
                    }
                    continue;
                }
            }
            return Some((found, tag_end(&self.buffer, found)));
        }
    }

    /// Text of `range` with every skip region cut out
    fn visible(&mut self, range: Range<usize>) -> String {
        let mut text = String::new();
        let mut pos = range.start;
        while pos < range.end {
            match self.next_skip(pos) {
                Some(region) if region.start < range.end => {
                    text.push_str(&self.buffer[pos..region.start.max(pos)]);
                    pos = region.end;
                }
                _ => {
                    text.push_str(&self.buffer[pos..range.end]);
                    break;
                }
            }
        }
        text
    }

    /// First skip region that ends after `pos`, indexing further as needed
    fn next_skip(&mut self, pos: usize) -> Option<Range<usize>> {
        if let Some(region) = self.skips.after(pos) {
            return Some(region);
        }
        while !self.skips.complete {
            match self.scan_skip(self.skips.scanned_to) {
                Some(region) => {
                    self.skips.scanned_to = region.end;
                    self.skips.regions.push(region.clone());
                    if region.end > pos {
                        return Some(region);
                    }
                }
                None => self.skips.complete = true,
            }
        }
        None
    }

    /// Skip region whose opener is the first one at or after `from`
    fn scan_skip(&mut self, from: usize) -> Option<Range<usize>> {
        let merger = self.merger;
        let opener = merger.skip_opener.as_ref()?;
        let mut at = from;
        loop {
            let (start, opener_end, element) = {
                let caps = opener.captures_at(&self.buffer, at)?;
                let whole = caps.get(0)?;
                (whole.start(), whole.end(), caps.get(1).map(|m| m.as_str().to_ascii_lowercase()))
            };

            let Some(element) = element else {
                let comment = self.buffer[start..].starts_with("<!--");
                let terminator = if comment { "-->" } else { "]]>" };
                let end = match self.buffer[opener_end..].find(terminator) {
                    Some(found) => opener_end + found + terminator.len(),
                    None => {
                        self.note_unterminated(comment, start);
                        self.buffer.len()
                    }
                };
                return Some(start..end);
            };

            let content = tag_end(&self.buffer, start);
            if self.buffer[start..content].ends_with("/>") {
                at = content;
                continue;
            }
            let close = self
                .tag_pattern(&element, true)
                .and_then(|pattern| pattern.find_at(&self.buffer, content))
                .map_or(self.buffer.len(), |found| found.start());
            return Some(content..close);
        }
    }

    fn note_unterminated(&mut self, comment: bool, start: usize) {
        if comment {
            self.report.unterminated_comments += 1;
            warn!("Unterminated comment at offset {} runs to the end of the document", start);
        } else {
            warn!("Unterminated CDATA section at offset {} runs to the end of the document", start);
        }
    }

    fn pattern(&mut self, key: &str, source: impl FnOnce() -> String) -> Option<Regex> {
        if let Some(regex) = self.patterns.get(key) {
            return Some(regex.clone());
        }
        match Regex::new(&source()) {
            Ok(regex) => {
                self.patterns.insert(key.to_string(), regex.clone());
                Some(regex)
            }
            Err(e) => {
                warn!("Cannot search for '{}': {}", key, e);
                None
            }
        }
    }
}

fn starts_with_element(tag_body: &str, element: &str) -> bool {
    let Some(head) = tag_body.get(..element.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(element)
        && tag_body[element.len()..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || c == '/' || c == '>')
}
