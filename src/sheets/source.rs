//! Tabular sources - where scanned identity rows come from

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{Row, Workbook, WorkbookCatalog, WorkbookStore};
use crate::config::{SettingsProvider, SourceLocation};
use crate::error::{IdentityError, Result};

/// Fetch every row of a located tab, header included.
#[async_trait]
pub trait TabularSource: Send + Sync {
    async fn fetch(&self, location: &SourceLocation) -> Result<Vec<Row>>;
}

/// Resolves a location's URL through settings and reads the workbook behind it.
///
/// A URL equal to the active workbook's own URL is served from the snapshot
/// already in memory.
pub struct WorkbookSource {
    active: Arc<Workbook>,
    settings: Arc<dyn SettingsProvider>,
    catalog: WorkbookCatalog,
}

impl WorkbookSource {
    pub fn new(active: Arc<Workbook>, settings: Arc<dyn SettingsProvider>, catalog: WorkbookCatalog) -> Self {
        Self {
            active,
            settings,
            catalog,
        }
    }

    fn tab_rows(workbook: &Workbook, location: &SourceLocation) -> Result<Vec<Row>> {
        workbook
            .tab(&location.tab_name)
            .map(|tab| tab.rows.clone())
            .ok_or_else(|| {
                IdentityError::unavailable(
                    &location.source_key,
                    &location.tab_name,
                    format!("tab \"{}\" not found in spreadsheet", location.tab_name),
                )
            })
    }
}

#[async_trait]
impl TabularSource for WorkbookSource {
    async fn fetch(&self, location: &SourceLocation) -> Result<Vec<Row>> {
        let url_key = location.url_setting();
        let url = self.settings.get(&url_key).ok_or_else(|| {
            IdentityError::unavailable(
                &location.source_key,
                &location.tab_name,
                format!("URL setting \"{url_key}\" not found"),
            )
        })?;

        if url.trim() == self.active.url {
            debug!("{} is the active workbook", location);
            return Self::tab_rows(&self.active, location);
        }

        let path = self.catalog.resolve(&url);
        let workbook = WorkbookStore::new(&path).load().await.map_err(|e| {
            IdentityError::unavailable(
                &location.source_key,
                &location.tab_name,
                format!("cannot open {}: {}", path.display(), e),
            )
        })?;
        Self::tab_rows(&workbook, location)
    }
}
