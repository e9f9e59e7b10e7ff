//! Community-prefixed IDs (`BEL-00001`)
//!
//! The sequence is local to one community code and seeded only from the
//! directory itself. Only blank ID cells are filled; existing IDs are never
//! rewritten.

use tracing::info;

use super::{IdAllocator, IdChange, IdScheme, MasterIndex, SequenceStore, SyncPlan};
use crate::error::{IdentityError, Result};
use crate::sheets::{row_text, Row};

pub struct CommunityAssigner {
    scheme: IdScheme,
}

impl CommunityAssigner {
    pub fn new(code: &str, width: usize) -> Result<Self> {
        if code.trim().is_empty() {
            return Err(IdentityError::config("community code is blank"));
        }
        Ok(Self {
            scheme: IdScheme::community(code, width),
        })
    }

    pub fn scheme(&self) -> &IdScheme {
        &self.scheme
    }

    /// Find the ID column by its header text in row `header_row` (0-based).
    pub fn locate_id_column(rows: &[Row], header_row: usize, header_text: &str) -> Result<usize> {
        rows.get(header_row)
            .and_then(|header| header.iter().position(|cell| crate::sheets::cell_text(cell) == header_text))
            .ok_or_else(|| {
                IdentityError::config(format!(
                    "header \"{}\" not found in row {} of the directory",
                    header_text,
                    header_row + 1
                ))
            })
    }

    /// Fill blank ID cells below `header_row` with fresh community IDs.
    pub fn plan(
        &self,
        rows: &[Row],
        header_row: usize,
        id_column: usize,
        sequence: Option<Box<dyn SequenceStore>>,
    ) -> Result<SyncPlan> {
        let data = rows.iter().enumerate().skip(header_row + 1);

        let mut seed = MasterIndex::new();
        for (_, row) in data.clone() {
            if let Some(value) = self.scheme.parse_numeric(&row_text(row, id_column)) {
                seed.observe_numeric(value);
            }
        }
        info!("🏷️ Highest {} sequence in directory: {}", self.scheme.sequence_name(), seed.max_numeric_seen());

        let mut allocator = IdAllocator::new(seed, self.scheme.clone());
        if let Some(sequence) = sequence {
            allocator = allocator.with_sequence(sequence);
        }

        let mut plan = SyncPlan::default();
        for (row_index, row) in data {
            plan.rows_examined += 1;
            if !row_text(row, id_column).trim().is_empty() {
                continue;
            }
            let id = allocator.allocate_next()?;
            plan.changes.push(IdChange {
                row: row_index,
                previous: String::new(),
                id,
                newly_allocated: true,
            });
        }
        plan.new_ids = plan.changes.len();
        Ok(plan)
    }
}
