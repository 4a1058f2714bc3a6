//! Pattern storage and the song's pattern order.

use alloc::vec::Vec;
use core::fmt::Write;

use slotmap::SlotMap;

use crate::pattern::{pattern_name, Pattern, PatternId, PatternName};

/// Maximum number of patterns in a table.
pub const MAX_PATTERNS: usize = 64;

/// Read-only projection of a pattern for pattern lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternMeta {
    pub id: PatternId,
    pub name: PatternName,
}

/// Owns every pattern, in insertion order, plus the playback order.
#[derive(Clone, Debug, Default)]
pub struct PatternTable {
    patterns: SlotMap<PatternId, Pattern>,
    /// Insertion order of `patterns`.
    insertion: Vec<PatternId>,
    /// Song order; repeats allowed.
    order: Vec<PatternId>,
    /// Number used for the next default name.
    next_number: u32,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new all-continue pattern at the end of the table and the
    /// order. Returns `None` when the table is full.
    pub fn insert(&mut self, name: Option<&str>) -> Option<PatternId> {
        if self.is_full() {
            return None;
        }
        self.next_number += 1;
        let mut default_name = PatternName::new();
        let _ = write!(default_name, "Pattern {}", self.next_number);
        let name = name.unwrap_or(default_name.as_str());

        let id = self.patterns.insert_with_key(|id| Pattern::new(id, name));
        self.insertion.push(id);
        self.order.push(id);
        Some(id)
    }

    /// Remove a pattern and every occurrence of it in the order.
    pub fn remove(&mut self, id: PatternId) -> Option<Pattern> {
        let pattern = self.patterns.remove(id)?;
        self.insertion.retain(|p| *p != id);
        self.order.retain(|p| *p != id);
        Some(pattern)
    }

    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    pub fn get_mut(&mut self, id: PatternId) -> Option<&mut Pattern> {
        self.patterns.get_mut(id)
    }

    pub fn contains(&self, id: PatternId) -> bool {
        self.patterns.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.patterns.len() >= MAX_PATTERNS
    }

    /// Patterns in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> + '_ {
        self.insertion.iter().filter_map(|id| self.patterns.get(*id))
    }

    /// Id/name pairs in insertion order.
    pub fn metadata(&self) -> Vec<PatternMeta> {
        self.iter()
            .map(|p| PatternMeta { id: p.id(), name: pattern_name(p.name()) })
            .collect()
    }

    // --- Pattern order ---

    pub fn order(&self) -> &[PatternId] {
        &self.order
    }

    /// Replace the order. Fails with the first unknown id, leaving the
    /// order untouched.
    pub fn set_order(&mut self, order: Vec<PatternId>) -> Result<(), PatternId> {
        if let Some(unknown) = order.iter().find(|id| !self.contains(**id)) {
            return Err(*unknown);
        }
        self.order = order;
        Ok(())
    }

    /// Append an existing pattern to the order.
    pub fn append_to_order(&mut self, id: PatternId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Remove the order entry at `index`.
    pub fn remove_order_entry(&mut self, index: usize) -> Option<PatternId> {
        (index < self.order.len()).then(|| self.order.remove(index))
    }
}
