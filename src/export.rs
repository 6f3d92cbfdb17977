/*!
 * Export recombiner.
 *
 * Replays a final skeleton: `%%%TU:n%%%` becomes the unit's current text
 * with its placeholder tags expanded back to native markup, `%%%FMT:n%%%`
 * becomes the registered literal. Expansion is depth-bounded.
 *
 * A unit whose markup does not validate is written as plain text; the rest
 * of the document is unaffected.
 */

use std::collections::{BTreeMap, HashMap};

use encoding_rs::Encoding;
use log::{debug, warn};

use crate::errors::{ConversionError, ExportError};
use crate::format::registry::MAX_RESOLVE_DEPTH;
use crate::format::{FormatTable, Placeholder, find_placeholders};
use crate::interchange::InterchangeDocument;
use crate::segment::tags::{find_inline_tags, foreign_tags, plain_text, unmark};
use crate::segment::{InlineTag, TagKind};

/// What export had to repair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Units written as plain text
    pub fallback_units: Vec<u32>,
    /// Units the skeleton references but the interchange lacks
    pub missing_units: Vec<u32>,
    pub errors: Vec<ExportError>,
}

/// The recombined document text
#[derive(Debug, Clone)]
pub struct Recombination {
    pub text: String,
    pub report: ExportReport,
}

pub struct Recombiner<'a> {
    formats: &'a FormatTable,
    // @field: validated unit text, core markers removed
    texts: HashMap<u32, String>,
    report: ExportReport,
}

impl<'a> Recombiner<'a> {
    /// Validate every unit of `document` against `formats`
    pub fn new(document: &InterchangeDocument, formats: &'a FormatTable) -> Self {
        let mut groups: BTreeMap<u32, Vec<(u32, String)>> = BTreeMap::new();
        for unit in &document.units {
            groups
                .entry(unit.paragraph)
                .or_default()
                .push((unit.id, unmark(unit.current_text())));
        }

        let mut texts = HashMap::with_capacity(document.units.len());
        let mut report = ExportReport::default();
        for siblings in groups.values() {
            let tags: Vec<Vec<InlineTag>> = siblings
                .iter()
                .map(|(_, text)| find_inline_tags(text))
                .collect();
            for (index, (id, text)) in siblings.iter().enumerate() {
                match validate_unit(*id, text, index, &tags, formats) {
                    Ok(()) => {
                        texts.insert(*id, text.clone());
                    }
                    Err(e) => {
                        warn!("{}; writing unit {} as plain text", e, id);
                        report.fallback_units.push(*id);
                        report.errors.push(e);
                        texts.insert(*id, plain_text(text));
                    }
                }
            }
        }

        Self { formats, texts, report }
    }

    /// Expand `skeleton` into the target document text
    pub fn recombine(mut self, skeleton: &str) -> Recombination {
        let text = self.expand(skeleton, 0);
        debug!(
            "Recombined {} bytes of skeleton into {} bytes ({} units as plain text)",
            skeleton.len(),
            text.len(),
            self.report.fallback_units.len()
        );
        Recombination {
            text,
            report: self.report,
        }
    }

    /// Replace the placeholders of native text
    fn expand(&mut self, text: &str, depth: usize) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in find_placeholders(text) {
            out.push_str(&text[last..found.start]);
            let expanded = match found.placeholder {
                Placeholder::Tu(id) => self.unit(id, depth),
                Placeholder::Format(id) => self.format(id, depth),
            };
            match expanded {
                Ok(expanded) => out.push_str(&expanded),
                Err(e) => self.record(e),
            }
            last = found.end;
        }
        out.push_str(&text[last..]);
        out
    }

    fn format(&mut self, id: u32, depth: usize) -> Result<String, ExportError> {
        if depth >= MAX_RESOLVE_DEPTH {
            return Err(ExportError::RecursionLimit(id));
        }
        let markup = self.formats.resolve(id)?;
        Ok(self.expand(&markup, depth + 1))
    }

    fn unit(&mut self, id: u32, depth: usize) -> Result<String, ExportError> {
        if depth >= MAX_RESOLVE_DEPTH {
            return Err(ExportError::RecursionLimit(id));
        }
        let Some(text) = self.texts.get(&id).cloned() else {
            warn!("Skeleton references unit {} which is not in the interchange", id);
            self.report.missing_units.push(id);
            return Ok(String::new());
        };

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for tag in find_inline_tags(&text) {
            out.push_str(&text[last..tag.start]);
            if let Some(format_id) = tag.id {
                match self.format(format_id, depth + 1) {
                    Ok(markup) => out.push_str(&markup),
                    Err(e) => self.record(e),
                }
            }
            last = tag.end;
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn record(&mut self, e: ExportError) {
        warn!("{}; expanding to nothing", e);
        self.report.errors.push(e);
    }
}

/// Check the placeholder tags of unit `index` of a paragraph group
fn validate_unit(
    unit: u32,
    text: &str,
    index: usize,
    siblings: &[Vec<InlineTag>],
    formats: &FormatTable,
) -> Result<(), ExportError> {
    if let Some(tag) = foreign_tags(text).into_iter().next() {
        return Err(ExportError::UnknownTag { tu: unit, tag });
    }

    let tags = &siblings[index];
    for (position, tag) in tags.iter().enumerate() {
        let Some(id) = tag.id else {
            return Err(ExportError::UnknownTag {
                tu: unit,
                tag: text[tag.start..tag.end].to_string(),
            });
        };
        if !formats.contains(id) {
            return Err(ExportError::MissingFormat(id));
        }
        if tag.kind == TagKind::Singleton {
            continue;
        }

        let Some(rid) = tag.rid else {
            return Err(ExportError::UnbalancedMarkup {
                tu: unit,
                detail: format!("tag {} has no rid", id),
            });
        };
        let partner = |other: &InlineTag| other.rid == Some(rid) && other.kind != tag.kind;
        let found = if tag.kind == TagKind::Begin {
            tags[position + 1..].iter().any(partner)
                || siblings[index + 1..].iter().flatten().any(partner)
        } else {
            tags[..position].iter().any(partner) || siblings[..index].iter().flatten().any(partner)
        };
        if !found {
            let detail = if tag.kind == TagKind::Begin {
                format!("bx rid {} is never closed", rid)
            } else {
                format!("ex rid {} was never opened", rid)
            };
            return Err(ExportError::UnbalancedMarkup { tu: unit, detail });
        }
    }
    Ok(())
}

/// Encode document text with the encoding labelled `label`.
///
/// Characters the encoding cannot represent are written as numeric
/// character references. UTF-16 output always starts with a BOM, UTF-8
/// output only when `bom` is set.
pub fn encode_document(text: &str, label: &str, bom: bool) -> Result<Vec<u8>, ConversionError> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ConversionError::Encoding(format!("unknown encoding '{}'", label)))?;
    if encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE {
        let little = encoding == encoding_rs::UTF_16LE;
        let mut bytes = Vec::with_capacity(2 * text.len() + 2);
        for unit in std::iter::once(0xFEFF).chain(text.encode_utf16()) {
            let pair = if little { unit.to_le_bytes() } else { unit.to_be_bytes() };
            bytes.extend_from_slice(&pair);
        }
        return Ok(bytes);
    }
    if encoding == encoding_rs::UTF_8 {
        let mut bytes = Vec::with_capacity(text.len() + 3);
        if bom {
            bytes.extend_from_slice(b"\xEF\xBB\xBF");
        }
        bytes.extend_from_slice(text.as_bytes());
        return Ok(bytes);
    }
    let (bytes, used, unmappable) = encoding.encode(text);
    if unmappable {
        warn!("Some characters are not representable in {}; wrote character references", used.name());
    }
    Ok(bytes.into_owned())
}
