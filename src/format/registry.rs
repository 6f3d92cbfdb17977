/*!
 * Placeholder/format registry.
 *
 * Ids are handed out in document order and never reused. Paired markup
 * draws a fresh rid for every Begin and pushes it on a LIFO pairing stack;
 * the matching End pops it, which keeps source order even when the native
 * markup overlaps improperly.
 */

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{Placeholder, find_placeholders};
use crate::errors::{ConversionError, ExportError};

/// Maximum nesting of format references resolved through each other
pub const MAX_RESOLVE_DEPTH: usize = 16;

/// Allocates format ids and pairing ids for one document
#[derive(Debug, Default)]
pub struct FormatRegistry {
    // @field: id -> literal markup
    entries: BTreeMap<u32, String>,
    next_id: u32,
    next_rid: u32,
    // @field: open pairs as (element, rid), innermost last
    pairing: Vec<(String, u32)>,
}

impl FormatRegistry {
    /// Create an empty registry; the first id is 1
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
            next_rid: 1,
            pairing: Vec::new(),
        }
    }

    /// Store literal markup and return its id
    pub fn allocate(&mut self, markup: impl Into<String>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, markup.into());
        id
    }

    /// Literal markup stored under `id`, without resolving nested placeholders
    pub fn get(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Draw a fresh rid for the open half of `element`
    pub fn open_pair(&mut self, element: &str) -> u32 {
        let rid = self.next_rid;
        self.next_rid += 1;
        self.pairing.push((element.to_string(), rid));
        rid
    }

    /// Pop the rid of the innermost open `element`.
    ///
    /// Overlapping markup closes an element that is not on top; its rid is
    /// taken out from further down and the elements above it stay open.
    pub fn close_pair(&mut self, element: &str) -> Option<u32> {
        let index = self.pairing.iter().rposition(|(name, _)| name == element)?;
        if index + 1 != self.pairing.len() {
            debug!("Overlapping markup: </{}> closes below {} open elements", element, self.pairing.len() - index - 1);
        }
        let (_, rid) = self.pairing.remove(index);
        Some(rid)
    }

    /// Number of pairs still open
    pub fn open_pairs(&self) -> usize {
        self.pairing.len()
    }

    /// Number of allocated entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze into a serializable table
    pub fn into_table(self) -> FormatTable {
        FormatTable {
            entries: self.entries,
        }
    }
}

/// The format table artifact: id -> literal markup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatTable {
    pub entries: BTreeMap<u32, String>,
}

impl FormatTable {
    /// Markup stored under `id`
    pub fn get(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Whether `id` exists
    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Markup of `id` with nested format references expanded.
    ///
    /// Translation unit references are left in place for the caller.
    pub fn resolve(&self, id: u32) -> Result<String, ExportError> {
        self.resolve_at(id, 0)
    }

    fn resolve_at(&self, id: u32, depth: usize) -> Result<String, ExportError> {
        if depth >= MAX_RESOLVE_DEPTH {
            return Err(ExportError::RecursionLimit(id));
        }
        let markup = self.get(id).ok_or(ExportError::MissingFormat(id))?;

        let mut out = String::with_capacity(markup.len());
        let mut last = 0;
        for found in find_placeholders(markup) {
            out.push_str(&markup[last..found.start]);
            match found.placeholder {
                Placeholder::Format(nested) => out.push_str(&self.resolve_at(nested, depth + 1)?),
                Placeholder::Tu(_) => out.push_str(&markup[found.start..found.end]),
            }
            last = found.end;
        }
        out.push_str(&markup[last..]);
        Ok(out)
    }

    /// Load a table from JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConversionError::MissingFile(path.to_path_buf()).into());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read format table: {:?}", path))?;
        let table = serde_json::from_str(&content)
            .map_err(|e| ConversionError::MalformedInput(format!("format table {:?}: {}", path, e)))?;
        Ok(table)
    }

    /// Write the table as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize format table")?;
        crate::file_utils::FileManager::write_to_file(path, &json)
    }
}
