/*!
 * Segment boundary splitting.
 *
 * Paragraph mode yields the paragraph as one segment. Sentence mode cuts on
 * locale-dependent sentence terminators, preens each sentence on its own,
 * and folds sentences without translatable text into the translatable
 * segment before them so that no text is lost and no empty unit is made.
 */

use std::ops::Range;

use log::trace;

use super::BoundaryMode;
use super::preen::Preener;
use super::tags::{InlineTag, find_inline_tags};
use crate::language_utils::{self, SentenceRules};

/// Closing punctuation that stays with the sentence before it
fn is_closer(c: char) -> bool {
    matches!(
        c,
        '"' | '\'' | ')' | ']' | '}' | '»' | '”' | '’' | '」' | '』' | '）' | '】' | '〉' | '》'
    )
}

/// One segment of a paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Core-marked text when translatable, literal text otherwise
    pub text: String,
    /// Whether the segment becomes a translation unit
    pub translatable: bool,
}

/// Locale-aware segment splitter
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    preener: Preener,
}

impl Splitter {
    /// Create a splitter that preens with `preener`
    pub fn new(preener: Preener) -> Self {
        Self { preener }
    }

    /// The preener used for each segment
    pub fn preener(&self) -> &Preener {
        &self.preener
    }

    /// Split paragraph text into ordered segments.
    ///
    /// Returns an empty vector when nothing in the paragraph is translatable.
    pub fn split(&self, paragraph: &str, mode: BoundaryMode, locale: &str) -> Vec<Segment> {
        let pieces: Vec<&str> = match mode {
            BoundaryMode::Paragraph => vec![paragraph],
            BoundaryMode::Sentence => self
                .sentence_spans(paragraph, locale)
                .into_iter()
                .map(|span| &paragraph[span])
                .collect(),
        };

        let mut segments: Vec<Segment> = Vec::new();
        for piece in pieces {
            let preened = self.preener.preen(piece, mode);
            if preened.has_core() {
                segments.push(Segment {
                    text: preened.to_marked_string(),
                    translatable: true,
                });
                continue;
            }

            // an empty sentence rides along with the one before it
            match segments.last_mut() {
                Some(previous) => previous.text.push_str(piece),
                None => segments.push(Segment {
                    text: piece.to_string(),
                    translatable: false,
                }),
            }
        }

        if !segments.iter().any(|segment| segment.translatable) {
            return Vec::new();
        }

        trace!("Split paragraph into {} segments", segments.len());
        segments
    }

    /// Byte ranges of the sentences of `text`, covering it completely
    pub fn sentence_spans(&self, text: &str, locale: &str) -> Vec<Range<usize>> {
        let rules = language_utils::sentence_rules(locale);
        let tags = find_inline_tags(text);
        let mut spans = Vec::new();
        let mut start = 0;
        let mut pos = 0;

        while pos < text.len() {
            if let Some(tag) = tag_at(&tags, pos) {
                pos = tag.end;
                continue;
            }
            let Some(c) = text[pos..].chars().next() else {
                break;
            };
            let after = pos + c.len_utf8();
            if !rules.is_terminator(c) {
                pos = after;
                continue;
            }

            match self.boundary_after(text, &tags, pos, c, rules, locale) {
                Some(boundary) if boundary < text.len() => {
                    spans.push(start..boundary);
                    start = boundary;
                    pos = boundary;
                }
                _ => pos = after,
            }
        }

        if start < text.len() {
            spans.push(start..text.len());
        }
        spans
    }

    /// Where the sentence ending with the terminator at `pos` stops, if it does
    fn boundary_after(
        &self,
        text: &str,
        tags: &[InlineTag],
        pos: usize,
        terminator: char,
        rules: SentenceRules,
        locale: &str,
    ) -> Option<usize> {
        let mut cursor = pos + terminator.len_utf8();

        // runs such as "?!" or "..."
        while let Some(c) = text[cursor..].chars().next() {
            if !rules.is_terminator(c) {
                break;
            }
            cursor += c.len_utf8();
        }
        while let Some(c) = text[cursor..].chars().next() {
            if !is_closer(c) {
                break;
            }
            cursor += c.len_utf8();
        }
        while let Some(tag) = tag_at(tags, cursor) {
            cursor = tag.end;
        }

        let space: usize = text[cursor..]
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(char::len_utf8)
            .sum();

        if SentenceRules::is_full_width_terminator(terminator) {
            return Some(cursor + space);
        }
        if space == 0 {
            return None;
        }

        let boundary = cursor + space;
        if terminator == '.' {
            if is_abbreviation(&text[..pos], locale) {
                return None;
            }
            if next_visible_char(text, tags, boundary).is_some_and(char::is_lowercase) {
                return None;
            }
        }
        Some(boundary)
    }
}

fn tag_at(tags: &[InlineTag], pos: usize) -> Option<&InlineTag> {
    tags.binary_search_by_key(&pos, |tag| tag.start)
        .ok()
        .map(|index| &tags[index])
}

fn next_visible_char(text: &str, tags: &[InlineTag], mut pos: usize) -> Option<char> {
    while pos < text.len() {
        if let Some(tag) = tag_at(tags, pos) {
            pos = tag.end;
            continue;
        }
        let c = text[pos..].chars().next()?;
        if !c.is_whitespace() {
            return Some(c);
        }
        pos += c.len_utf8();
    }
    None
}

/// Whether the word just before a period is an abbreviation or an initial
fn is_abbreviation(before: &str, locale: &str) -> bool {
    let word_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '.' || *c == 'º')
        .last()
        .map_or(before.len(), |(index, _)| index);
    let word = &before[word_start..];
    if word.is_empty() {
        return false;
    }

    let mut chars = word.chars();
    if let (Some(first), None) = (chars.next(), chars.next()) {
        if first.is_uppercase() {
            return true;
        }
    }

    language_utils::abbreviations(locale).contains(word.to_lowercase().as_str())
}
