//! Directory Synchronizer
//!
//! Applies the master index to a target tab. The index is authoritative:
//! an indexed name overwrites whatever ID the row currently holds. Names
//! the index has never seen get a fresh ID that is bound immediately, so
//! repeated names in one batch share it.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{CanonicalId, IdAllocator, KeyPolicy};
use crate::error::Result;
use crate::sheets::{row_text, CellWrite, DeltaWriter, Row};

/// One row whose ID actually changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdChange {
    /// 0-based row index in the tab, header rows included
    pub row: usize,
    pub previous: String,
    pub id: CanonicalId,
    pub newly_allocated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub changes: Vec<IdChange>,
    pub rows_examined: usize,
    pub rows_without_key: usize,
    pub new_ids: usize,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Minimal `(row, id)` writes for the ID column.
    pub fn writes(&self, id_column: usize) -> Vec<CellWrite> {
        self.changes
            .iter()
            .map(|change| CellWrite::new(change.row, id_column, change.id.as_str()))
            .collect()
    }
}

pub struct DirectorySynchronizer {
    policy: KeyPolicy,
    id_column: usize,
}

impl DirectorySynchronizer {
    pub fn new(policy: KeyPolicy) -> Self {
        Self { policy, id_column: 0 }
    }

    pub fn id_column(&self) -> usize {
        self.id_column
    }

    /// Compute the assignment for one row. `None` when the row keeps its ID.
    pub fn plan_row(&self, allocator: &mut IdAllocator, row_index: usize, row: &[Value]) -> Result<Option<IdChange>> {
        let key = self.policy.key_for_row(row);
        if key.is_empty() {
            return Ok(None);
        }

        let previous = row_text(row, self.id_column).trim().to_string();
        let (id, newly_allocated) = allocator.resolve_or_allocate(&key)?;
        if id.as_str() == previous {
            return Ok(None);
        }

        debug!("Row {} ('{}'): {:?} -> {}", row_index + 1, key, previous, id);
        Ok(Some(IdChange {
            row: row_index,
            previous,
            id,
            newly_allocated,
        }))
    }

    /// Plan every data row after `header_rows`.
    pub fn plan(&self, allocator: &mut IdAllocator, rows: &[Row], header_rows: usize) -> Result<SyncPlan> {
        let mut plan = SyncPlan::default();
        let allocated_before = allocator.allocated();

        for (row_index, row) in rows.iter().enumerate().skip(header_rows) {
            plan.rows_examined += 1;
            if self.policy.key_for_row(row).is_empty() {
                plan.rows_without_key += 1;
                continue;
            }
            if let Some(change) = self.plan_row(allocator, row_index, row)? {
                plan.changes.push(change);
            }
        }

        plan.new_ids = allocator.allocated() - allocated_before;
        Ok(plan)
    }

    /// Write the plan as one batch. Nothing is written for an empty plan.
    pub async fn apply(&self, plan: &SyncPlan, tab: &str, writer: &mut dyn DeltaWriter) -> Result<usize> {
        if plan.is_empty() {
            info!("✅ ID processing complete. No updates were needed.");
            return Ok(0);
        }

        let written = writer.write_batch(tab, &plan.writes(self.id_column)).await?;
        info!(
            "✅ ID processing complete. IDs updated/written: {}. New IDs generated: {}.",
            written, plan.new_ids
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdScheme, MasterIndex, NormalizedKey};
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingWriter {
        batches: Vec<(String, Vec<CellWrite>)>,
    }

    #[async_trait]
    impl DeltaWriter for RecordingWriter {
        async fn write_batch(&mut self, tab: &str, writes: &[CellWrite]) -> Result<usize> {
            self.batches.push((tab.to_string(), writes.to_vec()));
            Ok(writes.len())
        }
    }

    fn directory(rows: &[(&str, &str)]) -> Vec<Row> {
        let mut out = vec![vec![json!("Person ID"), json!("Full Name")]];
        out.extend(rows.iter().map(|(id, name)| vec![json!(id), json!(name)]));
        out
    }

    fn allocator_with(max: u64, known: &[(&str, u64)]) -> IdAllocator {
        let scheme = IdScheme::default();
        let mut index = MasterIndex::new();
        index.observe_numeric(max);
        for (name, id) in known {
            index.bind(NormalizedKey::from_name(name), scheme.format(*id));
        }
        IdAllocator::new(index, scheme)
    }

    #[test]
    fn test_repair_overwrites_and_matches_through_normalization() -> Result<()> {
        let mut allocator = allocator_with(17, &[("jane smith", 5)]);
        let rows = directory(&[("", "Jane   Smith"), ("00009", "jane smith"), ("00005", "JANE SMITH")]);

        let plan = DirectorySynchronizer::new(KeyPolicy::FullName).plan(&mut allocator, &rows, 1)?;

        assert_eq!(plan.changes.len(), 2);
        assert_eq!(plan.changes[0].row, 1);
        assert_eq!(plan.changes[0].id, "00005");
        assert_eq!(plan.changes[1].previous, "00009");
        assert_eq!(plan.new_ids, 0);
        Ok(())
    }

    #[test]
    fn test_shared_unseen_name_gets_one_new_id() -> Result<()> {
        let mut allocator = allocator_with(17, &[]);
        let rows = directory(&[("", "Bob Jones"), ("", "bob jones"), ("", "")]);

        let plan = DirectorySynchronizer::new(KeyPolicy::FullName).plan(&mut allocator, &rows, 1)?;

        assert_eq!(plan.changes.len(), 2);
        assert_eq!(plan.changes[0].id, "00018");
        assert_eq!(plan.changes[1].id, "00018");
        assert!(plan.changes[0].newly_allocated);
        assert!(!plan.changes[1].newly_allocated);
        assert_eq!(plan.new_ids, 1);
        assert_eq!(plan.rows_without_key, 1);
        assert_eq!(allocator.index().max_numeric_seen(), 18);
        Ok(())
    }

    #[test]
    fn test_keyless_row_keeps_existing_id() -> Result<()> {
        let mut allocator = allocator_with(3, &[]);
        let rows = directory(&[("00002", "  ")]);
        let plan = DirectorySynchronizer::new(KeyPolicy::FullName).plan(&mut allocator, &rows, 1)?;
        assert!(plan.is_empty());
        assert_eq!(allocator.allocated(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_writes_only_changed_rows() -> Result<()> {
        let mut allocator = allocator_with(17, &[("jane smith", 5)]);
        let rows = directory(&[("00005", "Jane Smith"), ("", "Bob Jones")]);
        let sync = DirectorySynchronizer::new(KeyPolicy::FullName);
        let plan = sync.plan(&mut allocator, &rows, 1)?;

        let mut writer = RecordingWriter::default();
        assert_eq!(sync.apply(&plan, "Directory", &mut writer).await?, 1);
        assert_eq!(writer.batches.len(), 1);
        assert_eq!(writer.batches[0].1, vec![CellWrite::new(2, 0, "00018")]);

        let empty = SyncPlan::default();
        assert_eq!(sync.apply(&empty, "Directory", &mut writer).await?, 0);
        assert_eq!(writer.batches.len(), 1);
        Ok(())
    }
}
