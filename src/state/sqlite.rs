use rusqlite::{Connection, OptionalExtension};

use crate::error::{MigrationError, Result};
use crate::state::{RevisionStore, DEFAULT_TABLE_NAME};

/// One-row revision table in a SQLite database.
pub struct SqliteRevisionStore<'a> {
    conn: &'a Connection,
    table_name: String,
}

impl<'a> SqliteRevisionStore<'a> {
    pub fn new(conn: &'a Connection) -> Result<Self> {
        Self::with_table_name(conn, DEFAULT_TABLE_NAME)
    }

    pub fn with_table_name(conn: &'a Connection, table_name: &str) -> Result<Self> {
        let store = Self {
            conn,
            table_name: table_name.to_string(),
        };
        store.ensure_table()?;
        Ok(store)
    }

    fn ensure_table(&self) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (revision_id VARCHAR(64) NOT NULL)",
                    self.table_name
                ),
                [],
            )
            .map_err(state_error)?;
        Ok(())
    }
}

impl RevisionStore for SqliteRevisionStore<'_> {
    fn current(&mut self) -> Result<Option<String>> {
        self.conn
            .query_row(
                &format!("SELECT revision_id FROM {} LIMIT 1", self.table_name),
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(state_error)
    }

    fn set_current(&mut self, revision: Option<&str>) -> Result<()> {
        self.conn
            .execute(&format!("DELETE FROM {}", self.table_name), [])
            .map_err(state_error)?;

        if let Some(revision) = revision {
            self.conn
                .execute(
                    &format!("INSERT INTO {} (revision_id) VALUES (?1)", self.table_name),
                    [revision],
                )
                .map_err(state_error)?;
        }
        Ok(())
    }
}

fn state_error(err: rusqlite::Error) -> MigrationError {
    MigrationError::State(err.to_string())
}
