/*!
 * Translation interchange model.
 *
 * One `TranslationUnit` per translatable segment. Payloads carry the core
 * marker pair around the translatable core and XLIFF-style inline tags for
 * native markup. The document is stored as JSON next to the skeleton.
 */

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;

use crate::errors::ConversionError;
use crate::file_utils::FileManager;
use crate::segment::tags::unmark;

/// Current interchange format version
pub const INTERCHANGE_VERSION: &str = "1.0";

/// One translatable segment with stable identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Unique id, referenced by `%%%TU:id%%%`
    pub id: u32,

    /// Paragraph group shared by the segments of one paragraph
    pub paragraph: u32,

    /// Core-marked source text
    pub source: String,

    /// Core-marked translation, filled by the translator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Another segment of the same paragraph follows
    #[serde(default)]
    pub mergeable: bool,
}

impl TranslationUnit {
    /// Create a unit without a target
    pub fn new(id: u32, paragraph: u32, source: impl Into<String>) -> Self {
        Self {
            id,
            paragraph,
            source: source.into(),
            target: None,
            mergeable: false,
        }
    }

    /// Target when present and non-empty, otherwise source
    pub fn current_text(&self) -> &str {
        match self.target.as_deref() {
            Some(target) if !target.is_empty() => target,
            _ => &self.source,
        }
    }

    /// Source text without core markers
    pub fn plain_source(&self) -> String {
        unmark(&self.source)
    }
}

/// Interchange document for one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeDocument {
    /// Format version
    pub version: String,

    /// Original file name
    pub original: String,

    /// Native format of the original (`html`, `docx`, ...)
    pub datatype: String,

    /// Encoding label of the original bytes
    pub encoding: String,

    /// The original started with a byte order mark
    #[serde(default)]
    pub bom: bool,

    /// Source locale
    pub source_language: String,

    /// Target locale
    pub target_language: String,

    /// Units in document order
    #[serde(default)]
    pub units: Vec<TranslationUnit>,
}

impl InterchangeDocument {
    /// Create an empty document
    pub fn new(
        original: impl Into<String>,
        datatype: impl Into<String>,
        encoding: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            version: INTERCHANGE_VERSION.to_string(),
            original: original.into(),
            datatype: datatype.into(),
            encoding: encoding.into(),
            bom: false,
            source_language: source_language.into(),
            target_language: target_language.into(),
            units: Vec::new(),
        }
    }

    /// Unit with `id`; units are kept sorted by id
    pub fn unit(&self, id: u32) -> Option<&TranslationUnit> {
        self.units
            .binary_search_by_key(&id, |unit| unit.id)
            .ok()
            .map(|index| &self.units[index])
    }

    /// Mutable unit with `id`
    pub fn unit_mut(&mut self, id: u32) -> Option<&mut TranslationUnit> {
        match self.units.binary_search_by_key(&id, |unit| unit.id) {
            Ok(index) => Some(&mut self.units[index]),
            Err(_) => None,
        }
    }

    /// Ids of the units in paragraph group `paragraph`, in document order
    pub fn paragraph_units(&self, paragraph: u32) -> Vec<u32> {
        self.units
            .iter()
            .filter(|unit| unit.paragraph == paragraph)
            .map(|unit| unit.id)
            .collect()
    }

    /// Check structural consistency: strictly increasing ids, non-empty sources
    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.encoding.is_empty() {
            return Err(ConversionError::MissingField("encoding".to_string()));
        }
        let mut previous: Option<u32> = None;
        for unit in &self.units {
            if previous.is_some_and(|prev| unit.id <= prev) {
                return Err(ConversionError::MalformedInput(format!(
                    "unit ids are not strictly increasing at {}",
                    unit.id
                )));
            }
            if unit.source.is_empty() {
                return Err(ConversionError::MissingField(format!("source of unit {}", unit.id)));
            }
            previous = Some(unit.id);
        }
        Ok(())
    }

    /// Parse and validate a document from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        let document: Self = serde_json::from_str(json).map_err(|e| {
            let message = e.to_string();
            match e.classify() {
                Category::Data if message.starts_with("missing field") => {
                    ConversionError::MissingField(message)
                }
                _ => ConversionError::MalformedInput(message),
            }
        })?;
        document.validate()?;
        Ok(document)
    }

    /// Load a document from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !FileManager::file_exists(path) {
            return Err(ConversionError::MissingFile(path.to_path_buf()).into());
        }
        let content = FileManager::read_to_string(path)?;
        let document = Self::from_json(&content)
            .with_context(|| format!("Failed to load interchange file: {:?}", path))?;
        Ok(document)
    }

    /// Write the document as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize interchange document")?;
        FileManager::write_to_file(path, &json)
    }
}
