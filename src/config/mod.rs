//! Configuration Module
//!
//! Settings lookup, the source location registry, the typed system
//! configuration derived from them, and process-level runtime options.

pub mod registry;
pub mod runtime;
pub mod system;
pub mod template;

pub use registry::{SourceLocation, SourceLocationRegistry, ID_CHECK_SENTINEL};
pub use runtime::RuntimeConfig;
pub use system::{CommunityOptions, IdSchemeKind, SystemConfig};

use std::collections::HashMap;

use crate::sheets::{row_text, Row};

/// Name of the configuration tab in the dashboard workbook.
pub const CONFIG_TAB: &str = "Config for Urls";

/// Settings key that always points at the active workbook.
pub const DASHBOARD_URL: &str = "Dashboard URL";

/// Key/value settings lookup
pub trait SettingsProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl SettingsProvider for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Settings read from the key/value rows of the configuration table.
#[derive(Debug, Clone, Default)]
pub struct TableSettings {
    values: HashMap<String, String>,
}

impl TableSettings {
    /// Every row below the header with both a key and a value becomes a setting.
    /// `Dashboard URL` is always the active workbook's own URL.
    pub fn from_rows(rows: &[Row], own_url: &str) -> Self {
        let mut values = HashMap::new();
        for row in rows.iter().skip(1) {
            let key = row_text(row, 0);
            let value = row_text(row, 1);
            let (key, value) = (key.trim(), value.trim());
            if !key.is_empty() && !value.is_empty() {
                values.insert(key.to_string(), value.to_string());
            }
        }
        if !own_url.is_empty() {
            values.insert(DASHBOARD_URL.to_string(), own_url.to_string());
        }
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsProvider for TableSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
