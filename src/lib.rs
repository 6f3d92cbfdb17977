/*!
 * # tuforge - document to translation interchange converter
 *
 * Converts documents into translation units plus the skeleton and format
 * table needed to rebuild them, and recombines translated units into the
 * original layout.
 *
 * ## Features
 *
 * - Core-text preening: bracketing markup and whitespace stay outside the
 *   translatable core of each unit
 * - Locale-aware sentence or paragraph segmentation
 * - Lenient HTML tokenizing with skeleton merging against the literal bytes,
 *   so untouched markup is reproduced exactly
 * - Depth-bounded placeholder recombination with per-unit markup validation
 * - Legacy encodings on both ends, office documents through a headless
 *   office suite
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `segment`: inline tags, tag classification, preening and splitting
 * - `format`: placeholders and the format table
 * - `markup`: document events and the lenient HTML producer
 * - `emit`: events to units, pseudo-skeleton and format table
 * - `skeleton`: pseudo-skeleton lines, position stack and the merger
 * - `interchange`: translation units and their file
 * - `export`: skeleton replay into the target document
 * - `bridge`: office-suite conversion
 * - `app_config`, `app_controller`, `file_utils`: configuration,
 *   orchestration and file handling
 * - `language_utils`: locale codes and per-language tables
 * - `errors`: custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod bridge;
pub mod emit;
pub mod errors;
pub mod export;
pub mod file_utils;
pub mod format;
pub mod interchange;
pub mod language_utils;
pub mod markup;
pub mod segment;
pub mod skeleton;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, Task};
pub use bridge::{DocumentBridge, SofficeBridge};
pub use emit::{Emission, Emitter};
pub use errors::{AppError, BridgeError, ConversionError, ExportError};
pub use export::{Recombiner, encode_document};
pub use interchange::{InterchangeDocument, TranslationUnit};
pub use markup::{LenientHtmlProducer, Token, TokenProducer};
pub use segment::{BoundaryMode, CoreMarkedSegment, Preener, Splitter};
pub use skeleton::{PseudoSkeleton, SkeletonMerger};
