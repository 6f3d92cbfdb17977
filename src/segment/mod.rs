/*!
 * Segment-level text processing.
 *
 * - `tags`: inline placeholder tags and core markers
 * - `classify`: tag verdicts shared by the preener and the skeleton merger
 * - `preen`: separates the translatable core from bracketing markup
 * - `split`: cuts paragraph text into sentence or paragraph segments
 */

use serde::{Deserialize, Serialize};

pub mod classify;
pub mod preen;
pub mod split;
pub mod tags;

pub use self::classify::TagVerdict;
pub use self::preen::{CoreMarkedSegment, PreenOptions, Preener};
pub use self::split::{Segment, Splitter};
pub use self::tags::{CORE_END, CORE_START, InlineTag, TagKind};

/// How paragraph text is cut into translation units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// One unit per sentence
    #[default]
    Sentence,
    /// One unit per paragraph
    Paragraph,
}

impl std::fmt::Display for BoundaryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sentence => write!(f, "sentence"),
            Self::Paragraph => write!(f, "paragraph"),
        }
    }
}

impl std::str::FromStr for BoundaryMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "sentence" => Ok(Self::Sentence),
            "paragraph" => Ok(Self::Paragraph),
            _ => Err(anyhow::anyhow!("Invalid boundary mode: {}", s)),
        }
    }
}
