//! Canonical person IDs and the active numbering scheme

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_ID_WIDTH: usize = 5;

/// A person ID as written to the sheets, e.g. `00005` or `BEL-00005`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for CanonicalId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Numbering scheme. Only one is active per deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdScheme {
    /// One global sequence, zero-padded: `00017`.
    Global { width: usize },
    /// A sequence local to a community code: `BEL-00017`.
    Community { code: String, width: usize },
}

impl IdScheme {
    pub fn global(width: usize) -> Self {
        IdScheme::Global { width }
    }

    pub fn community(code: impl Into<String>, width: usize) -> Self {
        IdScheme::Community {
            code: code.into().trim().to_uppercase(),
            width,
        }
    }

    pub fn format(&self, value: u64) -> CanonicalId {
        match self {
            IdScheme::Global { width } => CanonicalId(format!("{value:0width$}")),
            IdScheme::Community { code, width } => CanonicalId(format!("{code}-{value:0width$}")),
        }
    }

    /// Numeric value embedded in a raw identifier cell.
    ///
    /// Global: every non-digit is stripped (`P-0042` -> 42). Community: only
    /// IDs carrying this code's prefix count, and the leading digits after the
    /// dash are read.
    pub fn parse_numeric(&self, raw: &str) -> Option<u64> {
        match self {
            IdScheme::Global { .. } => {
                let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    return None;
                }
                digits.parse().ok()
            }
            IdScheme::Community { code, .. } => {
                let rest = raw.trim().strip_prefix(code.as_str())?.strip_prefix('-')?;
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    return None;
                }
                digits.parse().ok()
            }
        }
    }

    /// Name of this scheme's durable sequence.
    pub fn sequence_name(&self) -> String {
        match self {
            IdScheme::Global { .. } => "person_id".to_string(),
            IdScheme::Community { code, .. } => format!("person_id:{code}"),
        }
    }
}

impl Default for IdScheme {
    fn default() -> Self {
        IdScheme::global(DEFAULT_ID_WIDTH)
    }
}
