//! Source location registry
//!
//! Reads the ordered list of `(source key, tab name)` pairs to scan for
//! existing person IDs out of a bounded section of the configuration table.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sheets::{row_text, Row};

/// Label of the row that opens the location section.
pub const ID_CHECK_SENTINEL: &str = "PERSON ID CHECK LOCATIONS";

/// One tab to scan. Order in the registry is match precedence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub source_key: String,
    pub tab_name: String,
}

impl SourceLocation {
    pub fn new(source_key: impl Into<String>, tab_name: impl Into<String>) -> Self {
        Self {
            source_key: source_key.into(),
            tab_name: tab_name.into(),
        }
    }

    /// Settings key holding this source's URL, e.g. `Dashboard URL`.
    pub fn url_setting(&self) -> String {
        format!("{} URL", self.source_key)
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" -> \"{}\"", self.source_key, self.tab_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocationRegistry {
    locations: Vec<SourceLocation>,
}

impl SourceLocationRegistry {
    pub fn new(locations: Vec<SourceLocation>) -> Self {
        Self { locations }
    }

    /// Parse the section opened by `sentinel` and closed by the first blank key.
    ///
    /// A table without the sentinel yields an empty registry.
    pub fn parse(rows: &[Row], sentinel: &str) -> Self {
        let mut locations = Vec::new();
        let mut reading = false;

        for (index, row) in rows.iter().enumerate() {
            let key = row_text(row, 0);
            if !reading {
                reading = key == sentinel;
                continue;
            }

            let key = key.trim();
            if key.is_empty() {
                break;
            }

            let tab = row_text(row, 1);
            let tab = tab.trim();
            if tab.is_empty() {
                warn!("Config row {}: location \"{}\" has no tab name. Skipping.", index + 1, key);
                continue;
            }
            locations.push(SourceLocation::new(key, tab));
        }

        if !reading {
            warn!("Section \"{}\" not found in configuration table. Nothing to cross-reference.", sentinel);
        }
        debug!("Parsed {} source locations", locations.len());
        Self { locations }
    }

    pub fn locations(&self) -> &[SourceLocation] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, location: &SourceLocation) -> bool {
        self.locations.contains(location)
    }

    /// Append a location with the lowest precedence unless already listed.
    pub fn push_if_absent(&mut self, location: SourceLocation) -> bool {
        if self.contains(&location) {
            return false;
        }
        self.locations.push(location);
        true
    }
}
