//! Delta writes - one batch of changed cells per call

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{Workbook, WorkbookStore};
use crate::error::{IdentityError, Result};

/// A single cell to overwrite. Coordinates are 0-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellWrite {
    pub row: usize,
    pub column: usize,
    pub value: Value,
}

impl CellWrite {
    pub fn new(row: usize, column: usize, value: impl Into<Value>) -> Self {
        Self {
            row,
            column,
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait DeltaWriter: Send {
    /// Apply every write to `tab` as one batch. Returns the number of cells written.
    async fn write_batch(&mut self, tab: &str, writes: &[CellWrite]) -> Result<usize>;
}

/// Writes into an open workbook and persists it once per batch.
pub struct WorkbookWriter<'a> {
    workbook: &'a mut Workbook,
    store: &'a WorkbookStore,
}

impl<'a> WorkbookWriter<'a> {
    pub fn new(workbook: &'a mut Workbook, store: &'a WorkbookStore) -> Self {
        Self { workbook, store }
    }
}

#[async_trait]
impl<'a> DeltaWriter for WorkbookWriter<'a> {
    async fn write_batch(&mut self, tab: &str, writes: &[CellWrite]) -> Result<usize> {
        if writes.is_empty() {
            return Ok(0);
        }

        let target = self
            .workbook
            .tab_mut(tab)
            .ok_or_else(|| IdentityError::config(format!("sheet \"{tab}\" not found")))?;
        for write in writes {
            target.set_cell(write.row, write.column, write.value.clone());
        }

        self.store.save(self.workbook).await?;
        info!("💾 Wrote {} cells to \"{}\"", writes.len(), tab);
        Ok(writes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::Tab;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_batch_is_persisted_once() {
        let temp_dir = tempdir().unwrap();
        let store = WorkbookStore::new(temp_dir.path().join("dashboard.json"));
        let mut workbook = Workbook::new("dash").with_tab(Tab::new(
            "Directory",
            vec![vec![json!("Person ID"), json!("Full Name")], vec![json!(""), json!("Jane Smith")]],
        ));

        let mut writer = WorkbookWriter::new(&mut workbook, &store);
        let written = writer
            .write_batch("Directory", &[CellWrite::new(1, 0, "00005")])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.tab("Directory").unwrap().cell(1, 0), "00005");
    }

    #[tokio::test]
    async fn test_empty_batch_does_not_touch_disk() {
        let temp_dir = tempdir().unwrap();
        let store = WorkbookStore::new(temp_dir.path().join("never.json"));
        let mut workbook = Workbook::new("dash");

        let mut writer = WorkbookWriter::new(&mut workbook, &store);
        assert_eq!(writer.write_batch("Directory", &[]).await.unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_missing_tab_is_configuration_error() {
        let temp_dir = tempdir().unwrap();
        let store = WorkbookStore::new(temp_dir.path().join("dashboard.json"));
        let mut workbook = Workbook::new("dash");

        let mut writer = WorkbookWriter::new(&mut workbook, &store);
        let err = writer
            .write_batch("Directory", &[CellWrite::new(1, 0, "00005")])
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
