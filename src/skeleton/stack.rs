/*!
 * Position stack over the source buffer.
 *
 * The top entry is the merge cursor. Entries are pushed on every successful
 * tag match and dropped on backtrack; old entries the merger will never
 * return to are pruned from the bottom. The two bottom entries are a
 * sentinel and offset 0, so the stack is never empty.
 */

use std::ops::Range;

/// Bottom sentinel; never a valid buffer offset
pub const SENTINEL: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionStack {
    entries: Vec<usize>,
}

impl Default for PositionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionStack {
    pub fn new() -> Self {
        Self {
            entries: vec![SENTINEL, 0],
        }
    }

    /// The cursor
    pub fn peek(&self) -> usize {
        // the bottom entries are never removed
        self.entries.last().copied().unwrap_or(0)
    }

    pub fn push(&mut self, position: usize) {
        self.entries.push(position);
    }

    /// Drop the top entry; the last real entry is kept
    pub fn pop(&mut self) -> Option<usize> {
        if self.entries.len() <= 2 {
            return None;
        }
        self.entries.pop()
    }

    /// Number of entries, sentinel included
    pub fn height(&self) -> usize {
        self.entries.len()
    }

    /// Backtrack to a height recorded earlier
    pub fn truncate(&mut self, height: usize) {
        self.entries.truncate(height.max(2));
    }

    /// Discard the oldest entries until at most `height` real entries remain
    pub fn prune_to_height(&mut self, height: usize) {
        let real = self.entries.len() - 1;
        let keep = height.max(1);
        if real > keep {
            self.entries.drain(1..1 + real - keep);
        }
    }

    /// Rewrite every real entry after a buffer edit
    pub fn remap(&mut self, f: impl Fn(usize) -> usize) {
        for entry in self.entries.iter_mut().skip(1) {
            *entry = f(*entry);
        }
    }
}

/// Where `offset` lands after `edit` is replaced by `new_len` bytes.
///
/// Offsets at or after the end move with the text behind the edit, offsets
/// strictly inside collapse onto its start.
pub fn remap_offset(offset: usize, edit: &Range<usize>, new_len: usize) -> usize {
    if offset >= edit.end {
        offset - edit.len() + new_len
    } else if offset > edit.start {
        edit.start
    } else {
        offset
    }
}
