/*!
 * Pseudo-skeleton lines.
 *
 * The emitter writes one line per structural event it sees. The text form
 * is tab separated, one entry per line:
 *
 * ```text
 * 1	open	p	3:1
 * 2	tu	1
 * 3	close	p
 * 4	attr	img	alt
 * 5	fmt	2
 * ```
 *
 * The optional trailing `line:col` on element lines is the source position
 * of a literal event; synthesized events carry none.
 */

use std::fmt;

use crate::errors::ConversionError;
use crate::format::Placeholder;
use crate::markup::SourcePos;

/// One entry of the replay script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonLine {
    /// Element start tag
    Open {
        seq: u32,
        name: String,
        pos: Option<SourcePos>,
    },
    /// Element end tag
    Close {
        seq: u32,
        name: String,
        pos: Option<SourcePos>,
    },
    /// The next placeholder goes into this attribute of the last `element` tag
    Attribute { seq: u32, element: String, name: String },
    /// Translation unit placeholder
    Tu { seq: u32, id: u32 },
    /// Format table placeholder
    Format { seq: u32, id: u32 },
}

impl SkeletonLine {
    /// Sequence number
    pub fn seq(&self) -> u32 {
        match self {
            Self::Open { seq, .. }
            | Self::Close { seq, .. }
            | Self::Attribute { seq, .. }
            | Self::Tu { seq, .. }
            | Self::Format { seq, .. } => *seq,
        }
    }

    /// The placeholder this line inserts, if any
    pub fn placeholder(&self) -> Option<Placeholder> {
        match self {
            Self::Tu { id, .. } => Some(Placeholder::Tu(*id)),
            Self::Format { id, .. } => Some(Placeholder::Format(*id)),
            _ => None,
        }
    }

    fn parse(text: &str, number: usize) -> Result<Self, ConversionError> {
        let malformed = |what: &str| {
            ConversionError::MalformedInput(format!("skeleton line {}: {}", number, what))
        };
        let fields: Vec<&str> = text.split('\t').collect();
        let seq: u32 = fields
            .first()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| malformed("bad sequence number"))?;
        let field = |index: usize| {
            fields
                .get(index)
                .copied()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| malformed("missing field"))
        };
        let id = |index: usize| -> Result<u32, ConversionError> {
            field(index)?.parse().map_err(|_| malformed("bad id"))
        };
        let pos = |index: usize| -> Result<Option<SourcePos>, ConversionError> {
            match fields.get(index) {
                None => Ok(None),
                Some(raw) => raw.parse().map(Some).map_err(|_| malformed("bad position")),
            }
        };

        match field(1)? {
            "open" => Ok(Self::Open {
                seq,
                name: field(2)?.to_string(),
                pos: pos(3)?,
            }),
            "close" => Ok(Self::Close {
                seq,
                name: field(2)?.to_string(),
                pos: pos(3)?,
            }),
            "attr" => Ok(Self::Attribute {
                seq,
                element: field(2)?.to_string(),
                name: field(3)?.to_string(),
            }),
            "tu" => Ok(Self::Tu { seq, id: id(2)? }),
            "fmt" => Ok(Self::Format { seq, id: id(2)? }),
            other => Err(malformed(&format!("unknown kind '{}'", other))),
        }
    }
}

impl fmt::Display for SkeletonLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { seq, name, pos } | Self::Close { seq, name, pos } => {
                let kind = if matches!(self, Self::Open { .. }) { "open" } else { "close" };
                write!(f, "{}\t{}\t{}", seq, kind, name)?;
                if let Some(pos) = pos {
                    write!(f, "\t{}", pos)?;
                }
                Ok(())
            }
            Self::Attribute { seq, element, name } => write!(f, "{}\tattr\t{}\t{}", seq, element, name),
            Self::Tu { seq, id } => write!(f, "{}\ttu\t{}", seq, id),
            Self::Format { seq, id } => write!(f, "{}\tfmt\t{}", seq, id),
        }
    }
}

/// The intermediate replay script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PseudoSkeleton {
    lines: Vec<SkeletonLine>,
    next_seq: u32,
}

impl PseudoSkeleton {
    /// Create an empty script; the first sequence number is 1
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            next_seq: 1,
        }
    }

    fn seq(&mut self) -> u32 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn push_open(&mut self, name: &str, pos: Option<SourcePos>) {
        let seq = self.seq();
        self.lines.push(SkeletonLine::Open { seq, name: name.to_string(), pos });
    }

    pub fn push_close(&mut self, name: &str, pos: Option<SourcePos>) {
        let seq = self.seq();
        self.lines.push(SkeletonLine::Close { seq, name: name.to_string(), pos });
    }

    pub fn push_attribute(&mut self, element: &str, name: &str) {
        let seq = self.seq();
        self.lines.push(SkeletonLine::Attribute {
            seq,
            element: element.to_string(),
            name: name.to_string(),
        });
    }

    pub fn push_tu(&mut self, id: u32) {
        let seq = self.seq();
        self.lines.push(SkeletonLine::Tu { seq, id });
    }

    pub fn push_format(&mut self, id: u32) {
        let seq = self.seq();
        self.lines.push(SkeletonLine::Format { seq, id });
    }

    /// Lines in replay order
    pub fn lines(&self) -> &[SkeletonLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Parse the text form; sequence numbers must strictly increase
    pub fn parse(text: &str) -> Result<Self, ConversionError> {
        let mut lines: Vec<SkeletonLine> = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let raw = raw.trim_end_matches('\r');
            if raw.is_empty() {
                continue;
            }
            let line = SkeletonLine::parse(raw, index + 1)?;
            if let Some(previous) = lines.last() {
                if line.seq() <= previous.seq() {
                    return Err(ConversionError::MalformedInput(format!(
                        "skeleton line {}: sequence {} does not follow {}",
                        index + 1,
                        line.seq(),
                        previous.seq()
                    )));
                }
            }
            lines.push(line);
        }
        let next_seq = lines.last().map_or(1, |line| line.seq() + 1);
        Ok(Self { lines, next_seq })
    }
}

impl fmt::Display for PseudoSkeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
