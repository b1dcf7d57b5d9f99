use std::cell::RefCell;

use postgres::error::SqlState;
use postgres::Client;

use crate::backend::{Backend, Postgres};
use crate::column::{Column, ColumnType};
use crate::error::{MigrationError, Result};
use crate::executor::SchemaExecutor;
use crate::table::TableDef;

/// Runs schema changes over a shared client, so the same connection can
/// back a [`crate::state::PostgresRevisionStore`].
pub struct PostgresExecutor<'a> {
    client: &'a RefCell<Client>,
}

impl<'a> PostgresExecutor<'a> {
    pub fn new(client: &'a RefCell<Client>) -> Self {
        Self { client }
    }
}

impl SchemaExecutor for PostgresExecutor<'_> {
    fn backend(&self) -> &dyn Backend {
        &Postgres
    }

    fn describe_table(&mut self, name: &str) -> Result<Option<TableDef>> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT c.column_name::text,
                        c.data_type::text,
                        c.character_maximum_length::int4,
                        c.is_nullable::text,
                        c.column_default::text,
                        (
                            SELECT k.ordinal_position::int4
                            FROM information_schema.table_constraints tc
                            JOIN information_schema.key_column_usage k
                              ON k.constraint_name = tc.constraint_name
                             AND k.table_schema = tc.table_schema
                            WHERE tc.constraint_type = 'PRIMARY KEY'
                              AND tc.table_schema = c.table_schema
                              AND tc.table_name = c.table_name
                              AND k.column_name = c.column_name
                        )
                 FROM information_schema.columns c
                 WHERE c.table_schema = current_schema() AND c.table_name = $1
                 ORDER BY c.ordinal_position",
                &[&name],
            )
            .map_err(translate_error)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut key = Vec::new();
        let columns: Vec<Column> = rows
            .iter()
            .map(|row| {
                let data_type: String = row.get(1);
                let max_length: Option<i32> = row.get(2);
                let nullable: String = row.get(3);
                let key_position: Option<i32> = row.get(5);

                let declared = match max_length {
                    Some(len) => format!("{}({})", data_type, len),
                    None => data_type,
                };

                let name: String = row.get(0);
                if let Some(position) = key_position {
                    key.push((position, name.clone()));
                }

                let mut column = Column::new(name, ColumnType::Custom(declared));
                column.nullable = nullable == "YES";
                column.default = row.get(4);
                column.primary_key = key_position.is_some();
                column
            })
            .collect();
        key.sort();

        Ok(Some(TableDef::reflected(
            name,
            columns,
            key.into_iter().map(|(_, column)| column).collect(),
        )))
    }

    fn execute_sql(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(backend = "postgres", sql, "executing statement");
        self.client
            .borrow_mut()
            .batch_execute(sql)
            .map_err(translate_error)
    }

    fn begin(&mut self) -> Result<()> {
        self.execute_sql("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute_sql("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute_sql("ROLLBACK")
    }
}

fn translate_error(err: postgres::Error) -> MigrationError {
    match err.code() {
        Some(code) if is_conflict(code) => MigrationError::SchemaConflict(err.to_string()),
        _ => MigrationError::Driver(err.to_string()),
    }
}

fn is_conflict(code: &SqlState) -> bool {
    *code == SqlState::DUPLICATE_COLUMN
        || *code == SqlState::DUPLICATE_TABLE
        || *code == SqlState::UNDEFINED_COLUMN
        || *code == SqlState::UNDEFINED_TABLE
}
