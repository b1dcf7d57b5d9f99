use rusqlite::Connection;

use crate::backend::{Backend, Sqlite};
use crate::column::{Column, ColumnType};
use crate::error::{MigrationError, Result};
use crate::executor::SchemaExecutor;
use crate::table::TableDef;

const CONFLICT_MESSAGES: &[&str] = &[
    "duplicate column name",
    "already exists",
    "no such column",
    "no such table",
];

pub struct SqliteExecutor<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteExecutor<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SchemaExecutor for SqliteExecutor<'_> {
    fn backend(&self) -> &dyn Backend {
        &Sqlite
    }

    /// Reflects through `PRAGMA table_info`. Declared types come back as
    /// [`ColumnType::Custom`] so a rebuild recreates them verbatim.
    fn describe_table(&mut self, name: &str) -> Result<Option<TableDef>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "PRAGMA table_info({})",
                Sqlite.quote_identifier(name)
            ))
            .map_err(translate_error)?;

        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let declared: String = row.get(2)?;
                let not_null: bool = row.get(3)?;
                let default: Option<String> = row.get(4)?;
                let pk: i64 = row.get(5)?;

                let mut column = Column::new(name, ColumnType::Custom(declared));
                column.nullable = !not_null;
                column.primary_key = pk > 0;
                column.default = default;
                Ok((column, pk))
            })
            .map_err(translate_error)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(translate_error)?;

        if rows.is_empty() {
            return Ok(None);
        }

        // `pk` is the 1-based position of the column within the key.
        let mut key: Vec<(i64, String)> = rows
            .iter()
            .filter(|(_, pk)| *pk > 0)
            .map(|(column, pk)| (*pk, column.name.clone()))
            .collect();
        key.sort();

        let single_key = key.len() == 1;
        let columns = rows
            .into_iter()
            .map(|(mut column, _)| {
                if single_key && column.primary_key {
                    column.nullable = false;
                }
                column
            })
            .collect();

        Ok(Some(TableDef::reflected(
            name,
            columns,
            key.into_iter().map(|(_, column)| column).collect(),
        )))
    }

    fn execute_sql(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(backend = "sqlite", sql, "executing statement");
        self.conn.execute_batch(sql).map_err(translate_error)
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN").map_err(translate_error)
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(translate_error)
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK").map_err(translate_error)
    }
}

fn translate_error(err: rusqlite::Error) -> MigrationError {
    let message = err.to_string();
    if CONFLICT_MESSAGES.iter().any(|m| message.contains(m)) {
        MigrationError::SchemaConflict(message)
    } else {
        MigrationError::Driver(message)
    }
}
