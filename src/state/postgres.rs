use std::cell::RefCell;

use postgres::Client;

use crate::error::{MigrationError, Result};
use crate::state::{RevisionStore, DEFAULT_TABLE_NAME};

/// One-row revision table in PostgreSQL. Shares its client with a
/// [`crate::executor::PostgresExecutor`] so head updates join the step's
/// transaction.
pub struct PostgresRevisionStore<'a> {
    client: &'a RefCell<Client>,
    table_name: String,
}

impl<'a> PostgresRevisionStore<'a> {
    pub fn new(client: &'a RefCell<Client>) -> Result<Self> {
        Self::with_table_name(client, DEFAULT_TABLE_NAME)
    }

    pub fn with_table_name(client: &'a RefCell<Client>, table_name: &str) -> Result<Self> {
        let store = Self {
            client,
            table_name: table_name.to_string(),
        };
        store.ensure_table()?;
        Ok(store)
    }

    fn ensure_table(&self) -> Result<()> {
        self.client
            .borrow_mut()
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (revision_id VARCHAR(64) NOT NULL)",
                    self.table_name
                ),
                &[],
            )
            .map_err(state_error)?;
        Ok(())
    }
}

impl RevisionStore for PostgresRevisionStore<'_> {
    fn current(&mut self) -> Result<Option<String>> {
        let row = self
            .client
            .borrow_mut()
            .query_opt(
                &format!("SELECT revision_id FROM {} LIMIT 1", self.table_name),
                &[],
            )
            .map_err(state_error)?;

        Ok(row.map(|row| row.get(0)))
    }

    fn set_current(&mut self, revision: Option<&str>) -> Result<()> {
        let mut client = self.client.borrow_mut();
        client
            .execute(&format!("DELETE FROM {}", self.table_name), &[])
            .map_err(state_error)?;

        if let Some(revision) = revision {
            client
                .execute(
                    &format!("INSERT INTO {} (revision_id) VALUES ($1)", self.table_name),
                    &[&revision],
                )
                .map_err(state_error)?;
        }
        Ok(())
    }
}

fn state_error(err: postgres::Error) -> MigrationError {
    MigrationError::State(err.to_string())
}
