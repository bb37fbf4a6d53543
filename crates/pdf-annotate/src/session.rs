//! Session context shared by the editor's components

use crate::annotation::StyleState;
use crate::options::EditorOptions;
use crate::source::DocumentSource;
use crate::store::EditStore;
use crate::types::*;
use std::cell::{Cell, RefCell};
use std::sync::Arc;

/// The immutable source document
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Arc<[u8]>,
    rotations: Vec<Rotation>,
}

impl Document {
    /// Record the buffer and the stored rotation of every source page
    pub fn describe<S: DocumentSource>(bytes: Arc<[u8]>, source: &S) -> Result<Self> {
        let rotations = (1..=source.page_count())
            .map(|page| source.intrinsic_rotation(page))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bytes, rotations })
    }

    /// The original bytes, never modified by any edit
    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn page_count(&self) -> u32 {
        self.rotations.len() as u32
    }

    /// Stored rotation of a 1-based source page
    pub fn intrinsic_rotation(&self, page_number: u32) -> Option<Rotation> {
        page_number
            .checked_sub(1)
            .and_then(|i| self.rotations.get(i as usize))
            .copied()
    }
}

/// Mutable editing state of one loaded document
#[derive(Debug)]
pub struct SessionContext {
    pub document: Document,
    pub store: RefCell<EditStore>,
    pub style: RefCell<StyleState>,
    pub options: EditorOptions,
}

impl SessionContext {
    pub fn new(document: Document, options: EditorOptions) -> Self {
        let store = EditStore::new(document.page_count());
        let style = StyleState::from(&options.style);
        Self {
            document,
            store: RefCell::new(store),
            style: RefCell::new(style),
            options,
        }
    }
}

/// Holds a busy flag set until dropped
pub(crate) struct BusyGuard<'a>(&'a Cell<bool>);

impl<'a> BusyGuard<'a> {
    /// Set the flag, or return `None` if it is already set
    pub(crate) fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
