use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::default::Default;
use std::path::Path;

use crate::emit::{default_inline_elements, default_translatable_attributes, EmitOptions};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::segment::{BoundaryMode, PreenOptions};
use crate::skeleton::MergeOptions;

// Application configuration module
// This module handles the application configuration including loading,
// validating and saving configuration settings.

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "tuforge.json";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language locale (`en`, `en-US`, `fra`)
    pub source_language: String,

    /// Target language locale
    pub target_language: String,

    /// Segmentation settings
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Document markup settings
    #[serde(default)]
    pub markup: MarkupConfig,

    /// Skeleton merge settings
    #[serde(default)]
    pub merge: MergeOptions,

    /// Office-suite bridge settings
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Folder run settings
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Segmentation settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SegmentationConfig {
    // @field: Sentence or paragraph units
    #[serde(default)]
    pub boundary: BoundaryMode,

    // @field: Escaped tags such as `&lt;br&gt;` count as whitespace
    #[serde(default)]
    pub html_entity_tags: bool,
}

/// Markup settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarkupConfig {
    // @field: Elements folded into unit text as inline tags
    #[serde(default = "default_inline_elements")]
    pub inline_elements: Vec<String>,

    // @field: Attributes whose values are translated
    #[serde(default = "default_translatable_attributes")]
    pub translatable_attributes: Vec<String>,

    // @field: Elements whose content is never parsed
    #[serde(default = "default_raw_text_elements")]
    pub raw_text_elements: Vec<String>,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            inline_elements: default_inline_elements(),
            translatable_attributes: default_translatable_attributes(),
            raw_text_elements: default_raw_text_elements(),
        }
    }
}

/// Office-suite bridge settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Office suite executable
    #[serde(default = "default_bridge_program")]
    pub program: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: default_bridge_program(),
        }
    }
}

/// Folder run settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConcurrencyConfig {
    /// Documents converted at the same time
    #[serde(default = "default_max_parallel_documents")]
    pub max_parallel_documents: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_parallel_documents: default_max_parallel_documents(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_raw_text_elements() -> Vec<String> {
    vec!["script".to_string(), "style".to_string()]
}

fn default_bridge_program() -> String {
    "soffice".to_string()
}

fn default_max_parallel_documents() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn lowercase_set(names: &[String]) -> HashSet<String> {
    names.iter().map(|name| name.to_ascii_lowercase()).collect()
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        FileManager::write_to_file(path, &json)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        language_utils::validate_locale(&self.source_language)
            .with_context(|| format!("Invalid source language: {}", self.source_language))?;
        language_utils::validate_locale(&self.target_language)
            .with_context(|| format!("Invalid target language: {}", self.target_language))?;

        if self.merge.tu_break_tags.iter().all(|tag| tag.trim().is_empty()) {
            return Err(anyhow!("merge.tu_break_tags must name at least one tag"));
        }

        if self.concurrency.max_parallel_documents == 0 {
            return Err(anyhow!("concurrency.max_parallel_documents must be at least 1"));
        }

        if self.bridge.program.trim().is_empty() {
            return Err(anyhow!("bridge.program must not be empty"));
        }

        Ok(())
    }

    /// Preener settings
    pub fn preen_options(&self) -> PreenOptions {
        PreenOptions {
            html_entity_tags: self.segmentation.html_entity_tags,
        }
    }

    /// Emitter settings for the configured source language
    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            boundary: self.segmentation.boundary,
            locale: self.source_language.clone(),
            inline_elements: lowercase_set(&self.markup.inline_elements),
            translatable_attributes: lowercase_set(&self.markup.translatable_attributes),
            raw_text_elements: lowercase_set(&self.markup.raw_text_elements),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            segmentation: SegmentationConfig::default(),
            markup: MarkupConfig::default(),
            merge: MergeOptions::default(),
            bridge: BridgeConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
