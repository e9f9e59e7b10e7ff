//! ID Allocator
//!
//! Owns the run's master index and hands out new IDs above its running
//! maximum. Binding a new ID to a name is the caller's decision, except in
//! `resolve_or_allocate` which does both.

use tracing::debug;

use super::{CanonicalId, IdScheme, MasterIndex, NormalizedKey, SequenceStore};
use crate::error::{IdentityError, Result};

pub struct IdAllocator {
    index: MasterIndex,
    scheme: IdScheme,
    sequence: Option<Box<dyn SequenceStore>>,
    allocated: usize,
}

impl IdAllocator {
    pub fn new(index: MasterIndex, scheme: IdScheme) -> Self {
        Self {
            index,
            scheme,
            sequence: None,
            allocated: 0,
        }
    }

    /// Draw new values from a durable sequence instead of the in-memory counter.
    pub fn with_sequence(mut self, sequence: Box<dyn SequenceStore>) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn index(&self) -> &MasterIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut MasterIndex {
        &mut self.index
    }

    pub fn into_index(self) -> MasterIndex {
        self.index
    }

    pub fn scheme(&self) -> &IdScheme {
        &self.scheme
    }

    /// IDs handed out so far in this run.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Next ID above everything seen. Does not bind it to any name.
    pub fn allocate_next(&mut self) -> Result<CanonicalId> {
        let floor = self.index.max_numeric_seen();
        let next = match self.sequence.as_mut() {
            Some(sequence) => sequence.reserve(&self.scheme.sequence_name(), floor)?,
            None => floor
                .checked_add(1)
                .ok_or_else(|| IdentityError::config("person ID sequence is exhausted"))?,
        };

        self.index.observe_numeric(next);
        self.allocated += 1;
        let id = self.scheme.format(next);
        debug!("Allocated new ID {}", id);
        Ok(id)
    }

    /// Indexed ID for `key`, or a fresh one bound to it immediately.
    ///
    /// Returns the ID and whether it was newly allocated.
    pub fn resolve_or_allocate(&mut self, key: &NormalizedKey) -> Result<(CanonicalId, bool)> {
        if let Some(id) = self.index.get(key) {
            return Ok((id.clone(), false));
        }
        let id = self.allocate_next()?;
        self.index.bind(key.clone(), id.clone());
        Ok((id, true))
    }
}
