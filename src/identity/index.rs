//! Master Index - the name -> ID map rebuilt from every source each run
//!
//! Sources are fetched concurrently but applied strictly in registry order,
//! so the first source to present a name keeps it.

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{CanonicalId, IdScheme, KeyPolicy, NormalizedKey};
use crate::config::SourceLocationRegistry;
use crate::sheets::{row_text, Row, TabularSource};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterIndex {
    by_name: HashMap<NormalizedKey, CanonicalId>,
    max_numeric_seen: u64,
}

impl MasterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &NormalizedKey) -> Option<&CanonicalId> {
        self.by_name.get(key)
    }

    pub fn contains(&self, key: &NormalizedKey) -> bool {
        self.by_name.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn max_numeric_seen(&self) -> u64 {
        self.max_numeric_seen
    }

    /// Raise the running maximum; never lowers it.
    pub fn observe_numeric(&mut self, value: u64) {
        self.max_numeric_seen = self.max_numeric_seen.max(value);
    }

    /// Bind `key` unless it is already bound. Returns whether it was inserted.
    pub fn bind(&mut self, key: NormalizedKey, id: CanonicalId) -> bool {
        if key.is_empty() || self.by_name.contains_key(&key) {
            return false;
        }
        self.by_name.insert(key, id);
        true
    }

    /// Fold one scanned data row into the index.
    pub fn absorb_row(&mut self, row: &[Value], policy: KeyPolicy, scheme: &IdScheme) -> RowOutcome {
        let short = row.len() < policy.required_columns();
        let outcome = self.absorb_keyed(&row_text(row, 0), policy.key_for_row(row), scheme);
        if short && outcome != RowOutcome::Bound && outcome != RowOutcome::AlreadyBound {
            return RowOutcome::Malformed;
        }
        outcome
    }

    /// Fold a raw ID and an already-built key, for tabs whose name columns
    /// differ from the scanned layout.
    pub fn absorb_keyed(&mut self, raw_id: &str, key: NormalizedKey, scheme: &IdScheme) -> RowOutcome {
        let parsed = scheme.parse_numeric(raw_id);
        if let Some(value) = parsed {
            self.observe_numeric(value);
        }

        match parsed {
            Some(value) if value > 0 && !key.is_empty() => {
                if self.bind(key, scheme.format(value)) {
                    RowOutcome::Bound
                } else {
                    RowOutcome::AlreadyBound
                }
            }
            Some(_) => RowOutcome::IdOnly,
            None if raw_id.trim().is_empty() => RowOutcome::NoId,
            None => RowOutcome::Malformed,
        }
    }
}

/// What a scanned row contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Bound,
    /// The name was claimed by an earlier row or source.
    AlreadyBound,
    /// The ID counted toward the maximum but the name was unusable.
    IdOnly,
    NoId,
    /// Unparsable ID or too few columns.
    Malformed,
}

/// Counters from one index build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub locations_scanned: usize,
    pub locations_skipped: usize,
    pub rows_scanned: usize,
    pub malformed_rows: usize,
    pub unique_names: usize,
    pub highest_id: u64,
}

pub struct IdentityIndexBuilder<'a> {
    source: &'a dyn TabularSource,
    policy: KeyPolicy,
    scheme: IdScheme,
}

impl<'a> IdentityIndexBuilder<'a> {
    pub fn new(source: &'a dyn TabularSource, policy: KeyPolicy, scheme: IdScheme) -> Self {
        Self { source, policy, scheme }
    }

    /// Scan every location and build a fresh index.
    ///
    /// A failing location is logged and skipped; it never aborts the build.
    pub async fn build(&self, registry: &SourceLocationRegistry) -> (MasterIndex, ScanReport) {
        info!("🔍 Building master index from {} locations...", registry.len());

        let fetches = registry.locations().iter().map(|location| self.source.fetch(location));
        let results = join_all(fetches).await;

        let mut index = MasterIndex::new();
        let mut report = ScanReport::default();

        for (location, result) in registry.locations().iter().zip(results) {
            let rows: Vec<Row> = match result {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("⚠️ Skipping location {}: {}", location, e);
                    report.locations_skipped += 1;
                    continue;
                }
            };

            debug!("Scanning {} ({} rows)", location, rows.len());
            report.locations_scanned += 1;
            for (offset, row) in rows.iter().enumerate().skip(1) {
                report.rows_scanned += 1;
                if index.absorb_row(row, self.policy, &self.scheme) == RowOutcome::Malformed {
                    debug!("{} row {}: no usable identity data", location, offset + 1);
                    report.malformed_rows += 1;
                }
            }
        }

        report.unique_names = index.len();
        report.highest_id = index.max_numeric_seen();
        info!(
            "📇 Master list built. Unique names: {}. Highest ID: {}.",
            report.unique_names, report.highest_id
        );
        (index, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceLocation;
    use crate::error::{IdentityError, Result};
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedSource(HashMap<String, Vec<Row>>);

    #[async_trait]
    impl TabularSource for FixedSource {
        async fn fetch(&self, location: &SourceLocation) -> Result<Vec<Row>> {
            self.0
                .get(&location.tab_name)
                .cloned()
                .ok_or_else(|| IdentityError::unavailable(&location.source_key, &location.tab_name, "tab not found"))
        }
    }

    fn tab(rows: &[(Value, &str)]) -> Vec<Row> {
        let mut out = vec![vec![json!("Person ID"), json!("Full Name")]];
        out.extend(rows.iter().map(|(id, name)| vec![id.clone(), json!(name)]));
        out
    }

    #[tokio::test]
    async fn test_first_writer_wins_in_registry_order() {
        let mut tabs = HashMap::new();
        tabs.insert("Directory".to_string(), tab(&[(json!("00005"), "Jane Smith")]));
        tabs.insert("Service Attendance".to_string(), tab(&[(json!(9), "JANE  SMITH"), (json!(17), "")]));
        let source = FixedSource(tabs);

        let registry = SourceLocationRegistry::new(vec![
            SourceLocation::new("Dashboard", "Directory"),
            SourceLocation::new("Attendance Tracker", "Service Attendance"),
        ]);
        let (index, report) = IdentityIndexBuilder::new(&source, KeyPolicy::FullName, IdScheme::default())
            .build(&registry)
            .await;

        assert_eq!(index.get(&NormalizedKey::from_name("jane smith")).unwrap(), &"00005");
        assert_eq!(index.max_numeric_seen(), 17);
        assert_eq!(report.unique_names, 1);
        assert_eq!(report.rows_scanned, 3);
    }

    /// Answers each tab after its own delay.
    struct SlowSource {
        inner: FixedSource,
        delays: HashMap<String, u64>,
    }

    #[async_trait]
    impl TabularSource for SlowSource {
        async fn fetch(&self, location: &SourceLocation) -> Result<Vec<Row>> {
            if let Some(ms) = self.delays.get(&location.tab_name) {
                tokio::time::sleep(std::time::Duration::from_millis(*ms)).await;
            }
            self.inner.fetch(location).await
        }
    }

    #[tokio::test]
    async fn test_slow_first_location_still_wins() {
        let mut tabs = HashMap::new();
        tabs.insert("Directory".to_string(), tab(&[(json!("00005"), "Jane Smith")]));
        tabs.insert("Service Attendance".to_string(), tab(&[(json!("00009"), "jane smith")]));
        let source = SlowSource {
            inner: FixedSource(tabs),
            delays: HashMap::from([("Directory".to_string(), 50)]),
        };

        let registry = SourceLocationRegistry::new(vec![
            SourceLocation::new("Dashboard", "Directory"),
            SourceLocation::new("Attendance Tracker", "Service Attendance"),
        ]);
        let (index, report) = IdentityIndexBuilder::new(&source, KeyPolicy::FullName, IdScheme::default())
            .build(&registry)
            .await;

        assert_eq!(index.get(&NormalizedKey::from_name("jane smith")).unwrap(), &"00005");
        assert_eq!(index.max_numeric_seen(), 9);
        assert_eq!(report.locations_scanned, 2);
    }

    #[test]
    fn test_absorb_keyed_uses_given_key() {
        let mut index = MasterIndex::new();
        let key = NormalizedKey::from_parts("Al", "Brown");
        assert_eq!(index.absorb_keyed("00017", key.clone(), &IdScheme::default()), RowOutcome::Bound);
        assert_eq!(index.get(&key).unwrap(), &"00017");
    }

    #[tokio::test]
    async fn test_unavailable_location_is_skipped() {
        let mut tabs = HashMap::new();
        tabs.insert("Event Attendance".to_string(), tab(&[(json!("P-0042"), "Bob Jones")]));
        let source = FixedSource(tabs);

        let registry = SourceLocationRegistry::new(vec![
            SourceLocation::new("Tools", "Missing"),
            SourceLocation::new("Central Response", "Event Attendance"),
        ]);
        let (index, report) = IdentityIndexBuilder::new(&source, KeyPolicy::FullName, IdScheme::default())
            .build(&registry)
            .await;

        assert_eq!(report.locations_skipped, 1);
        assert_eq!(report.locations_scanned, 1);
        assert_eq!(index.get(&NormalizedKey::from_name("bob jones")).unwrap(), &"00042");
    }

    #[test]
    fn test_zero_and_unparsable_ids_never_bind() {
        let mut index = MasterIndex::new();
        let scheme = IdScheme::default();

        assert_eq!(index.absorb_row(&[json!("0"), json!("Ann Lee")], KeyPolicy::FullName, &scheme), RowOutcome::IdOnly);
        assert_eq!(index.absorb_row(&[json!("TBD"), json!("Ann Lee")], KeyPolicy::FullName, &scheme), RowOutcome::Malformed);
        assert_eq!(index.absorb_row(&[json!(""), json!("Ann Lee")], KeyPolicy::FullName, &scheme), RowOutcome::NoId);
        assert_eq!(index.absorb_row(&[json!(33)], KeyPolicy::FullName, &scheme), RowOutcome::Malformed);
        assert!(index.is_empty());
        assert_eq!(index.max_numeric_seen(), 33);
    }
}
