use sea_query::MysqlQueryBuilder;

use crate::backend::{modify_column_sql, Backend, Ddl};
use crate::change::ColumnChanges;
use crate::error::{MigrationError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Backend for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn supports_alter_column(&self) -> bool {
        true
    }

    fn supports_drop_column(&self) -> bool {
        true
    }

    fn supports_transactional_ddl(&self) -> bool {
        // DDL statements commit implicitly
        false
    }

    fn build(&self, ddl: &Ddl) -> String {
        ddl.build(MysqlQueryBuilder)
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn alter_column_sql(
        &self,
        table: &str,
        column: &str,
        changes: &ColumnChanges,
    ) -> Result<Vec<String>> {
        // MODIFY COLUMN rewrites the whole definition
        let rewrites = changes.nullable.is_some() || matches!(changes.default, Some(Some(_)));
        if rewrites && changes.column_type.is_none() {
            return Err(MigrationError::UnsupportedOperation {
                backend: self.name().to_string(),
                detail: format!(
                    "altering {}.{} needs the full column type for MODIFY COLUMN",
                    table, column
                ),
            });
        }
        Ok(modify_column_sql(self, table, column, changes))
    }
}
