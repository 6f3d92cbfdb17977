/*!
 * Emitter: document events to translation units, pseudo-skeleton and
 * format table.
 *
 * A paragraph is the run of text and inline-element events between two
 * structural events. Paragraphs with translatable text are split into
 * translation units whose inline markup becomes `x`/`bx`/`ex` placeholder
 * tags; everything else is written to the skeleton as element lines and
 * format placeholders.
 */

use std::collections::HashSet;

use log::{debug, trace};

use crate::format::{FormatRegistry, FormatTable, ctype_for};
use crate::interchange::TranslationUnit;
use crate::markup::{Attribute, SourcePos, Token};
use crate::segment::tags::find_inline_tags;
use crate::segment::{BoundaryMode, InlineTag, Splitter, TagKind};
use crate::skeleton::PseudoSkeleton;

/// Elements folded into translation units as inline placeholders
pub fn default_inline_elements() -> Vec<String> {
    [
        "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "br", "cite", "code", "del", "dfn", "em",
        "font", "i", "img", "ins", "kbd", "mark", "q", "s", "samp", "small", "span", "strike",
        "strong", "sub", "sup", "tt", "u", "var", "wbr",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Attributes whose values become translation units
pub fn default_translatable_attributes() -> Vec<String> {
    ["alt", "title", "placeholder", "summary", "label"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Emitter settings
#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub boundary: BoundaryMode,
    /// Source locale, drives sentence rules
    pub locale: String,
    pub inline_elements: HashSet<String>,
    pub translatable_attributes: HashSet<String>,
    /// Elements whose content is kept verbatim
    pub raw_text_elements: HashSet<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            boundary: BoundaryMode::Sentence,
            locale: "en".to_string(),
            inline_elements: default_inline_elements().into_iter().collect(),
            translatable_attributes: default_translatable_attributes().into_iter().collect(),
            raw_text_elements: ["script", "style"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Everything the import phase writes for one document
#[derive(Debug, Clone)]
pub struct Emission {
    pub units: Vec<TranslationUnit>,
    pub skeleton: PseudoSkeleton,
    pub formats: FormatTable,
}

#[derive(Debug, Clone)]
pub struct Emitter {
    splitter: Splitter,
    options: EmitOptions,
}

impl Emitter {
    pub fn new(splitter: Splitter, options: EmitOptions) -> Self {
        Self { splitter, options }
    }

    pub fn options(&self) -> &EmitOptions {
        &self.options
    }

    /// Emit one document. Ids and sequence numbers follow event order.
    pub fn emit(&self, tokens: &[Token]) -> Emission {
        let mut state = EmitState {
            emitter: self,
            skeleton: PseudoSkeleton::new(),
            registry: FormatRegistry::new(),
            units: Vec::new(),
            next_unit: 1,
            next_group: 1,
            paragraph: Vec::new(),
            raw_element: None,
        };
        for token in tokens {
            state.event(token);
        }
        state.flush();

        debug!(
            "Emitted {} translation units, {} skeleton lines, {} format entries",
            state.units.len(),
            state.skeleton.len(),
            state.registry.len()
        );
        Emission {
            units: state.units,
            skeleton: state.skeleton,
            formats: state.registry.into_table(),
        }
    }

    fn is_inline(&self, name: &str) -> bool {
        self.options.inline_elements.contains(name)
    }
}

/// A placeholder tag before pairing is settled
#[derive(Debug)]
enum Piece {
    Text(String),
    Tag {
        kind: TagKind,
        id: u32,
        rid: Option<u32>,
        ctype: Option<&'static str>,
    },
}

struct EmitState<'a> {
    emitter: &'a Emitter,
    skeleton: PseudoSkeleton,
    registry: FormatRegistry,
    units: Vec<TranslationUnit>,
    next_unit: u32,
    next_group: u32,
    paragraph: Vec<&'a Token>,
    // @field: open raw-text element, its content is literal
    raw_element: Option<String>,
}

impl<'a> EmitState<'a> {
    fn event(&mut self, token: &'a Token) {
        if let Some(raw) = self.raw_element.as_deref() {
            let closes = matches!(token, Token::EndTag { name, .. } if name == raw);
            if closes {
                self.raw_element = None;
            } else if let Token::Text { text, .. } = token {
                let id = self.registry.allocate(text.as_str());
                self.skeleton.push_format(id);
                return;
            }
        }

        match token {
            Token::Text { .. } => self.paragraph.push(token),
            Token::StartTag { name, .. } | Token::EndTag { name, .. } if self.emitter.is_inline(name) => {
                self.paragraph.push(token)
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
                pos,
                ..
            } => {
                self.flush();
                self.open_element(name, attributes, *pos);
                if !self_closing && self.emitter.options.raw_text_elements.contains(name) {
                    self.raw_element = Some(name.clone());
                }
            }
            Token::EndTag { name, pos, .. } => {
                self.flush();
                self.skeleton.push_close(name, *pos);
            }
            Token::Comment { raw, .. } | Token::Cdata { raw, .. } | Token::Declaration { raw, .. } => {
                self.flush();
                let id = self.registry.allocate(raw.as_str());
                self.skeleton.push_format(id);
            }
        }
    }

    /// Element line plus attribute units
    fn open_element(&mut self, name: &str, attributes: &[Attribute], pos: Option<SourcePos>) {
        self.skeleton.push_open(name, pos);
        for attribute in attributes {
            let Some(value) = &attribute.value else {
                continue;
            };
            if let Some(id) = self.attribute_unit(&attribute.name, value) {
                self.skeleton.push_attribute(name, &attribute.name);
                self.skeleton.push_tu(id);
            }
        }
    }

    /// A unit in its own paragraph group for a translatable attribute value
    fn attribute_unit(&mut self, name: &str, value: &str) -> Option<u32> {
        if !self.emitter.options.translatable_attributes.contains(name)
            || value.is_empty()
            || value.starts_with('$')
            || value.contains("%%%")
        {
            return None;
        }
        let preened = self
            .emitter
            .splitter
            .preener()
            .preen(value, BoundaryMode::Paragraph);
        if !preened.has_core() {
            return None;
        }
        let id = self.unit_id();
        let group = self.group_id();
        self.units
            .push(TranslationUnit::new(id, group, preened.to_marked_string()));
        trace!("Attribute '{}' became unit {}", name, id);
        Some(id)
    }

    fn unit_id(&mut self) -> u32 {
        let id = self.next_unit;
        self.next_unit += 1;
        id
    }

    fn group_id(&mut self) -> u32 {
        let id = self.next_group;
        self.next_group += 1;
        id
    }

    fn flush(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let paragraph = std::mem::take(&mut self.paragraph);
        let text: String = paragraph
            .iter()
            .filter_map(|token| match token {
                Token::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if self.emitter.splitter.preener().has_translatable_text(&text) {
            self.emit_translatable(&paragraph);
        } else {
            self.emit_structural(&paragraph);
        }
    }

    /// Paragraph without translatable text: element lines and literal text
    fn emit_structural(&mut self, paragraph: &[&Token]) {
        for token in paragraph {
            match token {
                Token::Text { text, .. } if !text.is_empty() => {
                    let id = self.registry.allocate(text.as_str());
                    self.skeleton.push_format(id);
                }
                Token::StartTag { name, attributes, pos, .. } => self.open_element(name, attributes, *pos),
                Token::EndTag { name, pos, .. } => self.skeleton.push_close(name, *pos),
                _ => {}
            }
        }
    }

    fn emit_translatable(&mut self, paragraph: &[&Token]) {
        let pieces = self.pieces(paragraph);
        let text = render(&pieces);
        let emitter = self.emitter;
        let segments = emitter
            .splitter
            .split(&text, emitter.options.boundary, &emitter.options.locale);
        if segments.is_empty() {
            let id = self.literal_format(&text);
            self.skeleton.push_format(id);
            return;
        }

        let group = self.group_id();
        let last = segments.iter().rposition(|segment| segment.translatable);
        for (index, segment) in segments.into_iter().enumerate() {
            if segment.translatable {
                let id = self.unit_id();
                let mut unit = TranslationUnit::new(id, group, segment.text);
                unit.mergeable = last.is_some_and(|last| index < last);
                self.units.push(unit);
                self.skeleton.push_tu(id);
            } else {
                let id = self.literal_format(&segment.text);
                self.skeleton.push_format(id);
            }
        }
    }

    /// Register inline markup and turn it into placeholder pieces
    fn pieces(&mut self, paragraph: &[&Token]) -> Vec<Piece> {
        let mut pieces = Vec::with_capacity(paragraph.len());
        for token in paragraph {
            match token {
                Token::Text { text, .. } => pieces.push(Piece::Text(text.clone())),
                Token::StartTag {
                    name,
                    attributes,
                    self_closing,
                    raw,
                    ..
                } => {
                    let markup = match raw {
                        Some(raw) => self.inline_markup(raw, attributes),
                        None => String::new(),
                    };
                    let id = self.registry.allocate(markup);
                    let ctype = ctype_for(name);
                    if *self_closing {
                        pieces.push(Piece::Tag { kind: TagKind::Singleton, id, rid: None, ctype });
                    } else {
                        let rid = self.registry.open_pair(name);
                        pieces.push(Piece::Tag { kind: TagKind::Begin, id, rid: Some(rid), ctype });
                    }
                }
                Token::EndTag { name, raw, .. } => {
                    let id = self.registry.allocate(raw.clone().unwrap_or_default());
                    let ctype = ctype_for(name);
                    match self.registry.close_pair(name) {
                        Some(rid) => pieces.push(Piece::Tag { kind: TagKind::End, id, rid: Some(rid), ctype }),
                        None => pieces.push(Piece::Tag { kind: TagKind::Singleton, id, rid: None, ctype }),
                    }
                }
                _ => {}
            }
        }
        pieces
    }

    /// Literal tag text with translatable attribute values swapped for
    /// unit references
    fn inline_markup(&mut self, raw: &str, attributes: &[Attribute]) -> String {
        let mut swaps = Vec::new();
        for attribute in attributes {
            let (Some(value), Some(span)) = (&attribute.value, &attribute.value_span) else {
                continue;
            };
            if let Some(id) = self.attribute_unit(&attribute.name, value) {
                swaps.push((span.clone(), id));
            }
        }
        let mut markup = raw.to_string();
        for (span, id) in swaps.into_iter().rev() {
            markup.replace_range(span, &format!("%%%TU:{}%%%", id));
        }
        markup
    }

    /// Format entry for untranslatable segment text; inline tags become
    /// format references to their own entries
    fn literal_format(&mut self, text: &str) -> u32 {
        let mut literal = String::with_capacity(text.len());
        let mut last = 0;
        for tag in find_inline_tags(text) {
            literal.push_str(&text[last..tag.start]);
            if let Some(id) = tag.id {
                literal.push_str(&format!("%%%FMT:{}%%%", id));
            }
            last = tag.end;
        }
        literal.push_str(&text[last..]);
        self.registry.allocate(literal)
    }
}

/// Segment text for the pieces; halves without a partner in the paragraph
/// become singletons
fn render(pieces: &[Piece]) -> String {
    let mut open: HashSet<u32> = HashSet::new();
    let mut paired: HashSet<u32> = HashSet::new();
    for piece in pieces {
        match piece {
            Piece::Tag { kind: TagKind::Begin, rid: Some(rid), .. } => {
                open.insert(*rid);
            }
            Piece::Tag { kind: TagKind::End, rid: Some(rid), .. } if open.contains(rid) => {
                paired.insert(*rid);
            }
            _ => {}
        }
    }

    let mut text = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(literal) => text.push_str(literal),
            Piece::Tag { kind, id, rid, ctype } => {
                let (kind, rid) = match rid {
                    Some(rid) if paired.contains(rid) => (*kind, Some(*rid)),
                    _ => (TagKind::Singleton, None),
                };
                text.push_str(&InlineTag::render(kind, *id, rid, *ctype));
            }
        }
    }
    text
}
