//! Ordered in-memory index of message entities.
//!
//! The index is the authoritative owner of every displayed message. Entries
//! stay in append order, which callers keep non-decreasing by id so lookups
//! can binary search. Removal is either a single explicit
//! [`remove_and_destroy`](MessageIndex::remove_and_destroy) or a batch
//! [`expunge`](MessageIndex::expunge) of soft-deleted entries.

use tracing::{debug, trace};

use crate::message::{MessageEntity, MessageId};

/// Errors from positional index access.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    /// Position outside `[0, len)`.
    #[error("position {pos} out of range for index of length {len}")]
    OutOfRange {
        /// Requested position.
        pos: usize,
        /// Length at the time of the request.
        len: usize,
    },
}

/// Id-ordered sequence of message entities.
#[derive(Debug, Default)]
pub struct MessageIndex {
    entries: Vec<MessageEntity>,
}

impl MessageIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of entries, including soft-deleted ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if `pos >= len()`.
    pub fn get(&self, pos: usize) -> Result<&MessageEntity, IndexError> {
        self.entries.get(pos).ok_or(IndexError::OutOfRange {
            pos,
            len: self.entries.len(),
        })
    }

    /// Mutable entry at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if `pos >= len()`.
    pub fn get_mut(&mut self, pos: usize) -> Result<&mut MessageEntity, IndexError> {
        let len = self.entries.len();
        self.entries
            .get_mut(pos)
            .ok_or(IndexError::OutOfRange { pos, len })
    }

    /// Append an entry at the end.
    ///
    /// The caller must keep ids non-decreasing across appends. This is not
    /// checked; an out-of-order id makes later lookups unreliable.
    pub fn append(&mut self, entity: MessageEntity) {
        trace!(id = entity.id(), "message appended");
        self.entries.push(entity);
    }

    /// Position of an entry with id `target`, or `None`.
    ///
    /// When several entries share the id, any one of their positions may be
    /// returned.
    pub fn find_index_by_id(&self, target: MessageId) -> Option<usize> {
        self.entries
            .binary_search_by_key(&target, MessageEntity::id)
            .ok()
    }

    /// Entry with id `target`, or `None`.
    pub fn find_by_id(&self, target: MessageId) -> Option<&MessageEntity> {
        self.find_index_by_id(target)
            .and_then(|pos| self.entries.get(pos))
    }

    /// Set the soft-delete mark on the entry at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if `pos >= len()`.
    pub fn mark_deleted(&mut self, pos: usize) -> Result<(), IndexError> {
        self.get_mut(pos)?.set_deleted(true);
        Ok(())
    }

    /// Clear the soft-delete mark on the entry at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if `pos >= len()`.
    pub fn mark_undeleted(&mut self, pos: usize) -> Result<(), IndexError> {
        self.get_mut(pos)?.set_deleted(false);
        Ok(())
    }

    /// Remove and drop the entry at `pos`, shifting later entries down.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if `pos >= len()`.
    pub fn remove_and_destroy(&mut self, pos: usize) -> Result<(), IndexError> {
        let len = self.entries.len();
        if pos >= len {
            return Err(IndexError::OutOfRange { pos, len });
        }
        let removed = self.entries.remove(pos);
        debug!(id = removed.id(), pos, "message removed");
        Ok(())
    }

    /// Drop every soft-deleted entry, keeping the rest in order.
    ///
    /// Returns the number of entries destroyed.
    pub fn expunge(&mut self) -> usize {
        let before = self.entries.len();
        let (kept, discarded): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|m| !m.is_deleted());
        self.entries = kept;
        let destroyed = discarded.len();
        drop(discarded);
        debug!(before, destroyed, "index expunged");
        destroyed
    }

    /// Number of entries carrying the soft-delete mark.
    pub fn deleted_count(&self) -> usize {
        self.entries.iter().filter(|m| m.is_deleted()).count()
    }

    /// Force every entry to recompute its display format on next access.
    pub fn invalidate_all_formats(&mut self) {
        for entry in &mut self.entries {
            entry.invalidate_format();
        }
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &MessageEntity> {
        self.entries.iter()
    }
}
