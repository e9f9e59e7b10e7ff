//! Typed system configuration
//!
//! Read once from the configuration tab and validated eagerly, so a
//! malformed setting fails before any source is scanned.

use tracing::{debug, info};

use super::{SettingsProvider, SourceLocationRegistry, TableSettings};
use crate::error::{IdentityError, Result};
use crate::identity::{IdScheme, KeyPolicy, DEFAULT_ID_WIDTH};
use crate::sheets::Workbook;
use crate::utils::parse_a1;

pub const MASTER_DIRECTORY_TAB: &str = "Master Directory Tab";
pub const NEW_MEMBER_FORM_TAB: &str = "New Member Form Tab";
pub const ID_SCHEME: &str = "Person ID Scheme";
pub const MATCH_POLICY: &str = "Person ID Match Policy";
pub const ID_WIDTH: &str = "Person ID Width";
pub const PROFILE_TAB: &str = "Profile Tab";
pub const COMMUNITY_CODE_CELL: &str = "Community Code Cell";
pub const ID_HEADER: &str = "Person ID Header";
pub const DIRECTORY_HEADER_ROW: &str = "Directory Header Row";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdSchemeKind {
    #[default]
    Global,
    Community,
}

/// Where the community scheme finds its code and ID column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityOptions {
    pub profile_tab: String,
    /// 0-based `(row, column)` of the community code
    pub code_cell: (usize, usize),
    pub id_header: String,
    /// 0-based header row of the directory
    pub header_row: usize,
}

impl Default for CommunityOptions {
    fn default() -> Self {
        Self {
            profile_tab: "Profile".to_string(),
            code_cell: (3, 4),
            id_header: "Person ID".to_string(),
            header_row: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub directory_tab: Option<String>,
    pub new_member_form_tab: Option<String>,
    pub sources: SourceLocationRegistry,
    pub scheme: IdSchemeKind,
    pub key_policy: KeyPolicy,
    pub id_width: usize,
    pub community: CommunityOptions,
}

impl SystemConfig {
    /// Load settings and the source registry from the workbook's configuration tab.
    ///
    /// A missing configuration tab aborts; a missing location section only
    /// leaves the registry empty.
    pub fn load(workbook: &Workbook, config_tab: &str, sentinel: &str) -> Result<(Self, TableSettings)> {
        let table = workbook.tab(config_tab).ok_or_else(|| {
            IdentityError::config(format!("\"{config_tab}\" sheet not found"))
        })?;

        let settings = TableSettings::from_rows(&table.rows, &workbook.url);
        let sources = SourceLocationRegistry::parse(&table.rows, sentinel);
        info!("Found {} locations to scan for Person IDs.", sources.len());

        let config = Self::from_settings(&settings, sources)?;
        Ok((config, settings))
    }

    pub fn from_settings(settings: &dyn SettingsProvider, sources: SourceLocationRegistry) -> Result<Self> {
        let scheme = match non_blank(settings, ID_SCHEME) {
            None => IdSchemeKind::Global,
            Some(raw) => match raw.to_lowercase().as_str() {
                "global" => IdSchemeKind::Global,
                "community" => IdSchemeKind::Community,
                _ => return Err(invalid(ID_SCHEME, &raw, "expected \"global\" or \"community\"")),
            },
        };

        let key_policy = match non_blank(settings, MATCH_POLICY) {
            None => KeyPolicy::default(),
            Some(raw) => KeyPolicy::parse(&raw)
                .ok_or_else(|| invalid(MATCH_POLICY, &raw, "expected \"full name\" or \"first last\""))?,
        };

        let id_width = match non_blank(settings, ID_WIDTH) {
            None => DEFAULT_ID_WIDTH,
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|w| (1..=18).contains(w))
                .ok_or_else(|| invalid(ID_WIDTH, &raw, "expected a number from 1 to 18"))?,
        };

        let mut community = CommunityOptions::default();
        if let Some(tab) = non_blank(settings, PROFILE_TAB) {
            community.profile_tab = tab;
        }
        if let Some(raw) = non_blank(settings, COMMUNITY_CODE_CELL) {
            community.code_cell =
                parse_a1(&raw).ok_or_else(|| invalid(COMMUNITY_CODE_CELL, &raw, "expected a cell like E4"))?;
        }
        if let Some(header) = non_blank(settings, ID_HEADER) {
            community.id_header = header;
        }
        if let Some(raw) = non_blank(settings, DIRECTORY_HEADER_ROW) {
            community.header_row = raw
                .parse::<usize>()
                .ok()
                .filter(|r| *r >= 1)
                .map(|r| r - 1)
                .ok_or_else(|| invalid(DIRECTORY_HEADER_ROW, &raw, "expected a 1-based row number"))?;
        }

        let config = Self {
            directory_tab: non_blank(settings, MASTER_DIRECTORY_TAB),
            new_member_form_tab: non_blank(settings, NEW_MEMBER_FORM_TAB),
            sources,
            scheme,
            key_policy,
            id_width,
            community,
        };
        debug!("System config: {:?}", config);
        Ok(config)
    }

    pub fn require_directory_tab(&self) -> Result<&str> {
        self.directory_tab
            .as_deref()
            .ok_or_else(|| IdentityError::config(format!("\"{MASTER_DIRECTORY_TAB}\" setting not found")))
    }

    pub fn require_form_tab(&self) -> Result<&str> {
        self.new_member_form_tab
            .as_deref()
            .ok_or_else(|| IdentityError::config(format!("\"{NEW_MEMBER_FORM_TAB}\" setting not found")))
    }

    pub fn global_scheme(&self) -> IdScheme {
        IdScheme::global(self.id_width)
    }
}

fn non_blank(settings: &dyn SettingsProvider, key: &str) -> Option<String> {
    settings
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(key: &str, value: &str, expected: &str) -> IdentityError {
    IdentityError::config(format!("setting \"{key}\" = \"{value}\" is invalid: {expected}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SourceLocation, ID_CHECK_SENTINEL};
    use crate::sheets::Tab;
    use serde_json::json;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = SystemConfig::from_settings(&settings(&[]), SourceLocationRegistry::default()).unwrap();
        assert_eq!(config.scheme, IdSchemeKind::Global);
        assert_eq!(config.key_policy, KeyPolicy::FullName);
        assert_eq!(config.id_width, 5);
        assert_eq!(config.community.code_cell, (3, 4));
        assert!(config.require_directory_tab().is_err());
    }

    #[test]
    fn test_malformed_values_fail_fast() {
        for (key, value) in [(ID_SCHEME, "regional"), (MATCH_POLICY, "id+name"), (ID_WIDTH, "wide"), (ID_WIDTH, "0")] {
            let err = SystemConfig::from_settings(&settings(&[(key, value)]), SourceLocationRegistry::default())
                .unwrap_err();
            assert!(err.to_string().contains(key), "{err}");
        }
    }

    #[test]
    fn test_load_from_workbook() {
        let workbook = Workbook::new("https://sheets.example/dashboard").with_tab(Tab::new(
            "Config for Urls",
            vec![
                vec![json!("Setting Name"), json!("Value"), json!("Description")],
                vec![json!("Master Directory Tab"), json!("Directory"), json!("")],
                vec![json!("Person ID Scheme"), json!("Community"), json!("")],
                vec![json!("Directory Header Row"), json!(2), json!("")],
                vec![json!(""), json!(""), json!("")],
                vec![json!(ID_CHECK_SENTINEL), json!(""), json!("")],
                vec![json!("Dashboard"), json!("Directory"), json!("")],
            ],
        ));

        let (config, settings) = SystemConfig::load(&workbook, "Config for Urls", ID_CHECK_SENTINEL).unwrap();
        assert_eq!(config.require_directory_tab().unwrap(), "Directory");
        assert_eq!(config.scheme, IdSchemeKind::Community);
        assert_eq!(config.community.header_row, 1);
        assert_eq!(config.sources.locations(), &[SourceLocation::new("Dashboard", "Directory")]);
        assert_eq!(settings.get("Dashboard URL").as_deref(), Some("https://sheets.example/dashboard"));
    }

    #[test]
    fn test_missing_config_tab_is_fatal() {
        let err = SystemConfig::load(&Workbook::new("dash"), "Config for Urls", ID_CHECK_SENTINEL).unwrap_err();
        assert!(err.is_fatal());
    }
}
