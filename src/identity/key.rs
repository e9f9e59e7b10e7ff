//! Normalized join keys
//!
//! Names are matched exactly after whitespace collapsing and case folding.
//! There is no fuzzy or phonetic matching.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::sheets::row_text;

/// Separator between first and last name parts. Whitespace collapsing
/// guarantees it never occurs inside a part.
const PART_SEPARATOR: char = '\t';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    /// Collapse internal whitespace, trim, and lower-case.
    pub fn from_name(raw: &str) -> Self {
        Self(collapse(raw))
    }

    /// Key for a (first, last) pair. Empty unless both parts are present.
    pub fn from_parts(first: &str, last: &str) -> Self {
        let (first, last) = (collapse(first), collapse(last));
        if first.is_empty() || last.is_empty() {
            return Self(String::new());
        }
        Self(format!("{first}{PART_SEPARATOR}{last}"))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.replace(PART_SEPARATOR, " / "))
    }
}

fn collapse(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Which columns form the join key. Exactly one policy is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Column 2 holds the full name.
    #[default]
    FullName,
    /// Columns 2 and 3 hold first and last name.
    FirstLast,
}

impl KeyPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match collapse(&raw.replace(['_', '-', '/', '+'], " ")).as_str() {
            "full name" | "name" => Some(KeyPolicy::FullName),
            "first last" | "first and last" => Some(KeyPolicy::FirstLast),
            _ => None,
        }
    }

    /// Columns a row needs for this policy, identifier included.
    pub fn required_columns(&self) -> usize {
        match self {
            KeyPolicy::FullName => 2,
            KeyPolicy::FirstLast => 3,
        }
    }

    pub fn key_for_row(&self, row: &[Value]) -> NormalizedKey {
        match self {
            KeyPolicy::FullName => NormalizedKey::from_name(&row_text(row, 1)),
            KeyPolicy::FirstLast => NormalizedKey::from_parts(&row_text(row, 1), &row_text(row, 2)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalization_collapses_and_folds() {
        assert_eq!(NormalizedKey::from_name("  Jane   Smith "), NormalizedKey::from_name("jane smith"));
        assert_eq!(NormalizedKey::from_name("JANE\tSMITH").as_str(), "jane smith");
        assert!(NormalizedKey::from_name("   ").is_empty());
    }

    #[test]
    fn test_parts_need_both_names() {
        assert!(NormalizedKey::from_parts("Jane", " ").is_empty());
        assert_eq!(NormalizedKey::from_parts(" Jane ", "SMITH"), NormalizedKey::from_parts("jane", "smith"));
        assert_ne!(NormalizedKey::from_parts("Jane Ann", "Smith"), NormalizedKey::from_parts("Jane", "Ann Smith"));
    }

    #[test]
    fn test_policy_columns() {
        let row = vec![json!("00005"), json!("Jane"), json!("Smith")];
        assert_eq!(KeyPolicy::FullName.key_for_row(&row).as_str(), "jane");
        assert_eq!(KeyPolicy::FirstLast.key_for_row(&row), NormalizedKey::from_parts("jane", "smith"));
        assert!(KeyPolicy::FirstLast.key_for_row(&row[..2]).is_empty());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(KeyPolicy::parse("Full Name"), Some(KeyPolicy::FullName));
        assert_eq!(KeyPolicy::parse("first_last"), Some(KeyPolicy::FirstLast));
        assert_eq!(KeyPolicy::parse("First/Last"), Some(KeyPolicy::FirstLast));
        assert_eq!(KeyPolicy::parse("id + name"), None);
    }
}
