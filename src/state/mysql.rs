use std::cell::RefCell;

use mysql::prelude::*;
use mysql::PooledConn;

use crate::error::{MigrationError, Result};
use crate::state::{RevisionStore, DEFAULT_TABLE_NAME};

/// One-row revision table in MySQL.
pub struct MySqlRevisionStore<'a> {
    conn: &'a RefCell<PooledConn>,
    table_name: String,
}

impl<'a> MySqlRevisionStore<'a> {
    pub fn new(conn: &'a RefCell<PooledConn>) -> Result<Self> {
        Self::with_table_name(conn, DEFAULT_TABLE_NAME)
    }

    pub fn with_table_name(conn: &'a RefCell<PooledConn>, table_name: &str) -> Result<Self> {
        let store = Self {
            conn,
            table_name: table_name.to_string(),
        };
        store.ensure_table()?;
        Ok(store)
    }

    fn ensure_table(&self) -> Result<()> {
        self.conn
            .borrow_mut()
            .query_drop(format!(
                "CREATE TABLE IF NOT EXISTS {} (revision_id VARCHAR(64) NOT NULL)",
                self.table_name
            ))
            .map_err(state_error)
    }
}

impl RevisionStore for MySqlRevisionStore<'_> {
    fn current(&mut self) -> Result<Option<String>> {
        self.conn
            .borrow_mut()
            .query_first(format!(
                "SELECT revision_id FROM {} LIMIT 1",
                self.table_name
            ))
            .map_err(state_error)
    }

    fn set_current(&mut self, revision: Option<&str>) -> Result<()> {
        let mut conn = self.conn.borrow_mut();
        conn.query_drop(format!("DELETE FROM {}", self.table_name))
            .map_err(state_error)?;

        if let Some(revision) = revision {
            conn.exec_drop(
                format!("INSERT INTO {} (revision_id) VALUES (?)", self.table_name),
                (revision,),
            )
            .map_err(state_error)?;
        }
        Ok(())
    }
}

fn state_error(err: mysql::Error) -> MigrationError {
    MigrationError::State(err.to_string())
}
