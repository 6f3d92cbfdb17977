/*!
 * Error types for the tuforge conversion pipeline.
 *
 * Each enum maps to one failure category of a conversion:
 * malformed input aborts a document, export-time markup corruption
 * only degrades one translation unit, and bridge failures are split
 * so callers can tell a retryable outage from a bad input file.
 * Structural ambiguity (phantom tags, dangling markup) never reaches
 * these types; it is resolved heuristically and logged.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort the conversion of one document
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The document or one of its artifacts could not be parsed
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A required field was absent from an artifact
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A required file does not exist
    #[error("Missing file: {0:?}")]
    MissingFile(PathBuf),

    /// The document encoding is unknown or the bytes cannot be decoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Errors reported by the external office-suite bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The bridge process could not be started or reached
    #[error("Bridge connection failed: {0}")]
    Connection(String),

    /// The bridge ran but did not produce a converted file
    #[error("Bridge conversion failed: {0}")]
    Conversion(String),
}

impl BridgeError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Markup problems detected while recombining one translation unit.
///
/// These never abort an export: the unit falls back to its stripped text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// A Begin without End (or the reverse) in a unit and its siblings
    #[error("Unbalanced inline markup in unit {tu}: {detail}")]
    UnbalancedMarkup {
        /// Unit id
        tu: u32,
        /// What was unbalanced
        detail: String,
    },

    /// A tag that is not one of the inline placeholder kinds
    #[error("Unrecognized tag in unit {tu}: {tag}")]
    UnknownTag {
        /// Unit id
        tu: u32,
        /// The offending tag text
        tag: String,
    },

    /// An inline tag refers to a format id absent from the table
    #[error("Format entry {0} not found")]
    MissingFormat(u32),

    /// Placeholder expansion nested deeper than allowed
    #[error("Placeholder nesting exceeded the limit at entry {0}")]
    RecursionLimit(u32),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error converting a document
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Error from the office-suite bridge
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Error recombining a document
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
