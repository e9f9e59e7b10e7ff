//! Durable ID Sequence
//!
//! Concurrent invocations each rebuild their own index and would compute the
//! same maximum. Drawing new IDs from an atomically incremented sequence
//! stored outside any one run removes that race.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use tracing::debug;

use crate::error::{IdentityError, Result};

/// A named, monotonically increasing counter shared across invocations.
pub trait SequenceStore: Send {
    /// Atomically store and return `max(stored, floor) + 1`.
    fn reserve(&mut self, name: &str, floor: u64) -> Result<u64>;
}

/// SQLite-backed sequence
pub struct SqliteSequence {
    conn: Connection,
}

impl SqliteSequence {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sequences (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl SequenceStore for SqliteSequence {
    fn reserve(&mut self, name: &str, floor: u64) -> Result<u64> {
        let floor = i64::try_from(floor)
            .map_err(|_| IdentityError::config(format!("ID {floor} exceeds the sequence range")))?;

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored: Option<i64> = tx
            .query_row("SELECT value FROM sequences WHERE name = ?1", params![name], |row| row.get(0))
            .optional()?;

        let next = stored
            .unwrap_or(0)
            .max(floor)
            .checked_add(1)
            .ok_or_else(|| IdentityError::config(format!("sequence '{name}' is exhausted")))?;

        tx.execute(
            "INSERT INTO sequences (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![name, next],
        )?;
        tx.commit()?;

        debug!("Reserved {} from sequence '{}'", next, name);
        Ok(next as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_reserve_respects_floor_and_history() -> Result<()> {
        let mut seq = SqliteSequence::in_memory()?;
        assert_eq!(seq.reserve("person_id", 17)?, 18);
        assert_eq!(seq.reserve("person_id", 17)?, 19);
        assert_eq!(seq.reserve("person_id", 40)?, 41);
        assert_eq!(seq.reserve("person_id:BEL", 0)?, 1);
        assert_eq!(seq.reserve("person_id", 0)?, 42);
        Ok(())
    }

    #[test]
    fn test_two_handles_never_share_a_value() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let mut first = SqliteSequence::open(temp_file.path())?;
        let mut second = SqliteSequence::open(temp_file.path())?;

        // Both runs saw the same maximum in the sheets.
        let a = first.reserve("person_id", 17)?;
        let b = second.reserve("person_id", 17)?;
        assert_ne!(a, b);
        assert_eq!((a, b), (18, 19));
        Ok(())
    }
}
