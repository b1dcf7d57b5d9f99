use std::cell::RefCell;

use mysql::prelude::*;
use mysql::PooledConn;

use crate::backend::{Backend, MySql};
use crate::column::{Column, ColumnType};
use crate::error::{MigrationError, Result};
use crate::executor::SchemaExecutor;
use crate::table::TableDef;

/// Server error codes for duplicate or missing tables and columns.
const CONFLICT_CODES: &[u16] = &[1050, 1051, 1054, 1060, 1091, 1146];

type ColumnRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<u32>,
);

pub struct MySqlExecutor<'a> {
    conn: &'a RefCell<PooledConn>,
}

impl<'a> MySqlExecutor<'a> {
    pub fn new(conn: &'a RefCell<PooledConn>) -> Self {
        Self { conn }
    }
}

impl SchemaExecutor for MySqlExecutor<'_> {
    fn backend(&self) -> &dyn Backend {
        &MySql
    }

    fn describe_table(&mut self, name: &str) -> Result<Option<TableDef>> {
        let rows: Vec<ColumnRow> = self
            .conn
            .borrow_mut()
            .exec(
                "SELECT c.COLUMN_NAME, c.COLUMN_TYPE, c.IS_NULLABLE, c.COLUMN_DEFAULT,
                        c.COLUMN_KEY, c.EXTRA,
                        (
                            SELECT s.SEQ_IN_INDEX
                            FROM information_schema.STATISTICS s
                            WHERE s.TABLE_SCHEMA = c.TABLE_SCHEMA
                              AND s.TABLE_NAME = c.TABLE_NAME
                              AND s.COLUMN_NAME = c.COLUMN_NAME
                              AND s.INDEX_NAME = 'PRIMARY'
                        )
                 FROM information_schema.COLUMNS c
                 WHERE c.TABLE_SCHEMA = DATABASE() AND c.TABLE_NAME = ?
                 ORDER BY c.ORDINAL_POSITION",
                (name,),
            )
            .map_err(translate_error)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut key = Vec::new();
        let columns: Vec<Column> = rows
            .into_iter()
            .map(
                |(column_name, column_type, nullable, default, column_key, extra, key_position)| {
                    if let Some(position) = key_position {
                        key.push((position, column_name.clone()));
                    }

                    let mut column = Column::new(column_name, ColumnType::Custom(column_type));
                    column.nullable = nullable == "YES";
                    column.primary_key = column_key == "PRI";
                    column.unique = column_key == "UNI";
                    column.default = default.map(|value| default_expression(value, &extra));
                    column
                },
            )
            .collect();
        key.sort();

        Ok(Some(TableDef::reflected(
            name,
            columns,
            key.into_iter().map(|(_, column)| column).collect(),
        )))
    }

    fn execute_sql(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(backend = "mysql", sql, "executing statement");
        self.conn
            .borrow_mut()
            .query_drop(sql)
            .map_err(translate_error)
    }

    fn begin(&mut self) -> Result<()> {
        self.execute_sql("START TRANSACTION")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute_sql("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute_sql("ROLLBACK")
    }
}

/// `information_schema` reports literal defaults unquoted; expressions are
/// flagged `DEFAULT_GENERATED`.
fn default_expression(value: String, extra: &str) -> String {
    if extra.contains("DEFAULT_GENERATED") || value.parse::<f64>().is_ok() {
        value
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

fn translate_error(err: mysql::Error) -> MigrationError {
    match err {
        mysql::Error::MySqlError(ref server) if CONFLICT_CODES.contains(&server.code) => {
            MigrationError::SchemaConflict(err.to_string())
        }
        other => MigrationError::Driver(other.to_string()),
    }
}
