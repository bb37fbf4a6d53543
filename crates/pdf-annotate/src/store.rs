//! Edit state store
//!
//! Owns the ordered page list and the per-entry annotation snapshots.
//! Snapshots are keyed by each entry's stable [`PageId`], never by position,
//! so deleting or moving entries cannot reattach a scene to another page.

use crate::annotation::Snapshot;
use crate::types::*;
use std::collections::HashMap;

/// Opaque, stable identity of a page entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl PageId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Editable representation of one source page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEntry {
    pub id: PageId,
    /// 1-based page number in the source document
    pub original_index: u32,
    /// Rotation added on top of the source page's own rotation
    pub rotation: Rotation,
}

/// One row of [`EditStore::export_view`]
#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntry {
    pub original_index: u32,
    pub rotation: Rotation,
    pub snapshot: Option<Snapshot>,
}

#[derive(Debug, Default)]
pub struct EditStore {
    entries: Vec<PageEntry>,
    snapshots: HashMap<PageId, Snapshot>,
    current: usize,
    next_id: u64,
}

impl EditStore {
    /// Build one entry per source page, in source order
    pub fn new(page_count: u32) -> Self {
        let mut store = Self::default();
        store.initialize(page_count);
        store
    }

    /// Reset the store for a freshly loaded document
    pub fn initialize(&mut self, page_count: u32) {
        self.snapshots.clear();
        self.current = 0;
        self.entries = (1..=page_count)
            .map(|original_index| PageEntry {
                id: self.allocate_id(),
                original_index,
                rotation: Rotation::NONE,
            })
            .collect();
    }

    fn allocate_id(&mut self) -> PageId {
        let id = PageId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    pub fn entry(&self, position: usize) -> Option<&PageEntry> {
        self.entries.get(position)
    }

    pub fn position_of(&self, id: PageId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn current_position(&self) -> usize {
        self.current
    }

    pub fn current_entry(&self) -> Option<&PageEntry> {
        self.entries.get(self.current)
    }

    pub fn set_current(&mut self, position: usize) -> Result<()> {
        self.check_position(position)?;
        self.current = position;
        Ok(())
    }

    /// Turn the entry at `position` by a quarter-turn delta.
    ///
    /// Unknown positions and deltas that are not multiples of 90 are ignored.
    pub fn rotate(&mut self, position: usize, delta: i32) {
        if let Some(entry) = self.entries.get_mut(position) {
            entry.rotation = entry.rotation.turned(delta);
        }
    }

    /// Remove the entry at `position` together with its own snapshot.
    ///
    /// Every remaining entry keeps its snapshot. The current position is
    /// clamped into the new range.
    pub fn delete(&mut self, position: usize) -> Result<PageEntry> {
        self.check_position(position)?;
        if self.entries.len() <= 1 {
            return Err(AnnotateError::DeleteRejected);
        }

        let removed = self.entries.remove(position);
        self.snapshots.remove(&removed.id);

        if self.current > position || self.current >= self.entries.len() {
            self.current = self.current.saturating_sub(1);
        }
        Ok(removed)
    }

    /// Move the entry at `from` so it ends up at `to`.
    ///
    /// The current position keeps pointing at the same entry.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_position(from)?;
        self.check_position(to)?;
        if from == to {
            return Ok(());
        }

        let current_id = self.entries[self.current].id;
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        self.current = self.position_of(current_id).unwrap_or(0);
        Ok(())
    }

    pub fn snapshot(&self, id: PageId) -> Option<&Snapshot> {
        self.snapshots.get(&id)
    }

    /// Replace the scene of an entry. Entries that no longer exist are ignored.
    pub fn set_snapshot(&mut self, id: PageId, snapshot: Snapshot) {
        if self.contains(id) {
            self.snapshots.insert(id, snapshot);
        } else {
            log::debug!("Ignoring snapshot for removed entry {:?}", id);
        }
    }

    /// Ordered view of the store as the export engine consumes it
    pub fn export_view(&self) -> Vec<ExportEntry> {
        self.entries
            .iter()
            .map(|entry| ExportEntry {
                original_index: entry.original_index,
                rotation: entry.rotation,
                snapshot: self.snapshots.get(&entry.id).cloned(),
            })
            .collect()
    }

    fn check_position(&self, position: usize) -> Result<()> {
        if position < self.entries.len() {
            Ok(())
        } else {
            Err(AnnotateError::InvalidPosition {
                position,
                len: self.entries.len(),
            })
        }
    }
}
