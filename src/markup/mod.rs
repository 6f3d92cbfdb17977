/*!
 * Document token model.
 *
 * A `TokenProducer` turns one native document into a total order of
 * events. Literal events keep their raw source text and position so the
 * emitter can register exact markup; events a lenient producer invents
 * (implied end tags, repaired start tags) carry neither.
 */

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::errors::ConversionError;

pub mod html;

pub use self::html::LenientHtmlProducer;

/// 1-based line and column of a literal event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl FromStr for SourcePos {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConversionError::MalformedInput(format!("bad source position '{}'", s));
        let (line, column) = s.split_once(':').ok_or_else(bad)?;
        Ok(Self {
            line: line.parse().map_err(|_| bad())?,
            column: column.parse().map_err(|_| bad())?,
        })
    }
}

/// An attribute of a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased name
    pub name: String,
    /// Raw value without quotes; `None` for a bare attribute
    pub value: Option<String>,
    /// Byte range of the value inside the tag's raw text
    pub value_span: Option<Range<usize>>,
}

/// One document event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        /// Lowercased element name
        name: String,
        attributes: Vec<Attribute>,
        /// Void element or `/>`: no end tag follows
        self_closing: bool,
        /// Literal tag text; `None` when synthesized
        raw: Option<String>,
        pos: Option<SourcePos>,
    },
    EndTag {
        name: String,
        raw: Option<String>,
        pos: Option<SourcePos>,
    },
    /// Raw text, entities left undecoded
    Text { text: String, pos: Option<SourcePos> },
    /// `<!-- ... -->`, delimiters included
    Comment { raw: String, pos: Option<SourcePos> },
    /// `<![CDATA[ ... ]]>`, delimiters included
    Cdata { raw: String, pos: Option<SourcePos> },
    /// Doctype or processing instruction
    Declaration { raw: String, pos: Option<SourcePos> },
}

impl Token {
    /// Source position of a literal event
    pub fn pos(&self) -> Option<SourcePos> {
        match self {
            Self::StartTag { pos, .. }
            | Self::EndTag { pos, .. }
            | Self::Text { pos, .. }
            | Self::Comment { pos, .. }
            | Self::Cdata { pos, .. }
            | Self::Declaration { pos, .. } => *pos,
        }
    }

    /// Whether the producer invented this event
    pub fn is_synthesized(&self) -> bool {
        match self {
            Self::StartTag { raw, .. } | Self::EndTag { raw, .. } => raw.is_none(),
            _ => false,
        }
    }

    /// Element name of a tag event
    pub fn element(&self) -> Option<&str> {
        match self {
            Self::StartTag { name, .. } | Self::EndTag { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Offset just past the `>` that ends the tag starting at `start`.
///
/// Quoted attribute values may contain `>`. An unbalanced quote falls back
/// to the first `>`; no `>` at all runs to the end of the buffer.
pub fn tag_end(buffer: &str, start: usize) -> usize {
    let mut quote: Option<u8> = None;
    for (offset, byte) in buffer.as_bytes()[start..].iter().enumerate() {
        match (quote, *byte) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(*byte),
            (None, b'>') => return start + offset + 1,
            _ => {}
        }
    }
    buffer[start..].find('>').map_or(buffer.len(), |end| start + end + 1)
}

/// Turns a native document into document events
pub trait TokenProducer {
    /// Produce the events of `source` in document order
    fn produce(&mut self, source: &str) -> Result<Vec<Token>, ConversionError>;
}
