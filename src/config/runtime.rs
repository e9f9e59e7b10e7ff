//! Runtime configuration - process-level options
//!
//! Precedence, lowest first: defaults, YAML file, environment, command line.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{CONFIG_TAB, ID_CHECK_SENTINEL};
use crate::error::Result;
use crate::sheets::WorkbookCatalog;

pub const ENV_WORKBOOK: &str = "ROSTER_WORKBOOK";
pub const ENV_SEQUENCE_DB: &str = "ROSTER_SEQUENCE_DB";
pub const ENV_CONFIG_FILE: &str = "ROSTER_CONFIG_FILE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// The active (dashboard) workbook
    pub workbook: PathBuf,
    pub config_tab: String,
    pub sentinel: String,
    /// Spreadsheet URL -> workbook file
    pub catalog: HashMap<String, PathBuf>,
    /// Durable ID sequence; without it only one invocation may run at a time
    pub sequence_db: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from("dashboard.json"),
            config_tab: CONFIG_TAB.to_string(),
            sentinel: ID_CHECK_SENTINEL.to_string(),
            catalog: HashMap::new(),
            sequence_db: None,
        }
    }
}

impl RuntimeConfig {
    pub async fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = fs::read_to_string(path.as_ref()).await?;
        Ok(serde_yaml::from_str(&yaml)?)
    }

    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_WORKBOOK).filter(|v| !v.is_empty()) {
            self.workbook = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_SEQUENCE_DB).filter(|v| !v.is_empty()) {
            self.sequence_db = Some(PathBuf::from(path));
        }
        self
    }

    /// Catalog resolving relative paths against the active workbook's directory.
    pub fn workbook_catalog(&self) -> WorkbookCatalog {
        let base = self
            .workbook
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        WorkbookCatalog::new(base).with_entries(self.catalog.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_yaml_then_env() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("roster.yaml");
        tokio::fs::write(
            &path,
            "workbook: /srv/roster/dashboard.json\ncatalog:\n  https://sheets.example/tracker: tracker.json\n",
        )
        .await
        .unwrap();

        let config = RuntimeConfig::from_yaml_file(&path).await.unwrap();
        assert_eq!(config.config_tab, "Config for Urls");
        assert_eq!(
            config.workbook_catalog().resolve("https://sheets.example/tracker"),
            PathBuf::from("/srv/roster/tracker.json")
        );

        let config = config.apply_env_from(|key| match key {
            ENV_SEQUENCE_DB => Some("/srv/roster/ids.db".to_string()),
            _ => None,
        });
        assert_eq!(config.workbook, PathBuf::from("/srv/roster/dashboard.json"));
        assert_eq!(config.sequence_db, Some(PathBuf::from("/srv/roster/ids.db")));
    }
}
