use sea_query::PostgresQueryBuilder;

use crate::backend::{Backend, Ddl};
use crate::change::TableRebuild;

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Backend for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn supports_alter_column(&self) -> bool {
        true
    }

    fn supports_drop_column(&self) -> bool {
        true
    }

    fn supports_transactional_ddl(&self) -> bool {
        true
    }

    fn build(&self, ddl: &Ddl) -> String {
        ddl.build(PostgresQueryBuilder)
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Serial sequences belong to the source column and would go with the
    /// dropped table; hand them to the staging table first.
    fn before_swap_sql(&self, rebuild: &TableRebuild, staging: &str) -> Vec<String> {
        rebuild
            .target
            .columns
            .iter()
            .filter_map(|column| {
                let sequence = column.default.as_deref().and_then(owned_sequence)?;
                Some(format!(
                    "ALTER SEQUENCE {} OWNED BY {}.{}",
                    sequence,
                    self.quote_identifier(staging),
                    self.quote_identifier(&column.name)
                ))
            })
            .collect()
    }
}

/// Sequence named by a `nextval('...')` default, as written in the catalog.
fn owned_sequence(default: &str) -> Option<&str> {
    let rest = default.trim().strip_prefix("nextval('")?;
    let end = rest.find("'")?;
    Some(&rest[..end])
}
