//! Workbook Store - JSON persistence for spreadsheets
//!
//! Each spreadsheet lives in its own JSON file. URLs found in settings are
//! mapped to files through a catalog.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::Workbook;
use crate::error::Result;

pub struct WorkbookStore {
    path: PathBuf,
}

impl WorkbookStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the workbook from disk
    pub async fn load(&self) -> Result<Workbook> {
        let json = fs::read_to_string(&self.path).await?;
        let workbook = serde_json::from_str(&json)?;
        debug!("Loaded workbook from {:?}", self.path);
        Ok(workbook)
    }

    /// Save the workbook in a single write
    pub async fn save(&self, workbook: &Workbook) -> Result<()> {
        let json = serde_json::to_string_pretty(workbook)?;
        fs::write(&self.path, json).await?;
        debug!("Saved workbook to {:?}", self.path);
        Ok(())
    }
}

/// Maps spreadsheet URLs to workbook files.
#[derive(Debug, Clone, Default)]
pub struct WorkbookCatalog {
    base_dir: PathBuf,
    entries: HashMap<String, PathBuf>,
}

impl WorkbookCatalog {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            entries: HashMap::new(),
        }
    }

    pub fn with_entries(mut self, entries: HashMap<String, PathBuf>) -> Self {
        self.entries = entries;
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(url.into(), path.into());
    }

    /// Catalog entry first, then `file://` URLs, then a path relative to the base directory.
    pub fn resolve(&self, url: &str) -> PathBuf {
        let url = url.trim();
        let raw = match self.entries.get(url) {
            Some(path) => path.clone(),
            None => PathBuf::from(url.strip_prefix("file://").unwrap_or(url)),
        };
        if raw.is_absolute() {
            raw
        } else {
            self.base_dir.join(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::Tab;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_workbook_save_load() {
        let temp_dir = tempdir().unwrap();
        let store = WorkbookStore::new(temp_dir.path().join("dashboard.json"));

        let workbook = Workbook::new("https://sheets.example/dashboard").with_tab(Tab::new(
            "Directory",
            vec![vec![json!("Person ID"), json!("Full Name")], vec![json!(5), json!("Jane Smith")]],
        ));
        store.save(&workbook).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, workbook);
        assert_eq!(loaded.tab("Directory").unwrap().cell(1, 0), "5");
    }

    #[test]
    fn test_catalog_resolution_order() {
        let mut catalog = WorkbookCatalog::new("/data/roster");
        catalog.insert("https://sheets.example/tracker", "tracker.json");

        assert_eq!(
            catalog.resolve("https://sheets.example/tracker"),
            PathBuf::from("/data/roster/tracker.json")
        );
        assert_eq!(catalog.resolve("file:///tmp/donors.json"), PathBuf::from("/tmp/donors.json"));
        assert_eq!(catalog.resolve("events.json"), PathBuf::from("/data/roster/events.json"));
    }
}
