//! Error taxonomy for identity resolution
//!
//! Every failure is terminal for its own scope: the whole operation,
//! one source location, or one row.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// A required tab, table or setting is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A cross-referenced location could not be opened or its tab is missing.
    #[error("source '{source_key}' -> '{tab}' unavailable: {reason}")]
    SourceUnavailable {
        source_key: String,
        tab: String,
        reason: String,
    },

    /// A row lacks the expected columns or carries an unparsable identifier.
    #[error("row {row}: {reason}")]
    DataShape { row: usize, reason: String },

    #[error("workbook I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("runtime config is invalid: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("sequence store error: {0}")]
    Sequence(#[from] rusqlite::Error),
}

impl IdentityError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unavailable(
        source_key: impl Into<String>,
        tab: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SourceUnavailable {
            source_key: source_key.into(),
            tab: tab.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole operation.
    ///
    /// Source and row errors stay isolated to their own location or row.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            IdentityError::SourceUnavailable { .. } | IdentityError::DataShape { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_by_scope() {
        assert!(IdentityError::config("missing tab").is_fatal());
        assert!(!IdentityError::unavailable("Tools", "Directory", "no url").is_fatal());
        assert!(!IdentityError::DataShape { row: 3, reason: "short".into() }.is_fatal());
    }

    #[test]
    fn test_source_unavailable_message() {
        let err = IdentityError::unavailable("Attendance Tracker", "Service Attendance", "tab not found");
        assert_eq!(
            err.to_string(),
            "source 'Attendance Tracker' -> 'Service Attendance' unavailable: tab not found"
        );
    }
}
