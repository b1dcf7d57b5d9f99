//! Execution seam between migration steps and a concrete schema store.

mod catalog;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "mysql")]
mod mysql;

pub use catalog::SchemaCatalog;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresExecutor;

#[cfg(feature = "mysql")]
pub use self::mysql::MySqlExecutor;

use crate::backend::Backend;
use crate::change::{ColumnEdit, RebuildStrategy, SchemaChange, TableRebuild};
use crate::error::{MigrationError, Result};
use crate::table::TableDef;

/// A connection-like target that migration steps run against.
///
/// Drivers translate engine errors for duplicate or missing objects into
/// [`MigrationError::SchemaConflict`] and report everything else as
/// [`MigrationError::Driver`].
pub trait SchemaExecutor {
    fn backend(&self) -> &dyn Backend;

    /// Current definition of `name`, or `None` when the table does not exist.
    fn describe_table(&mut self, name: &str) -> Result<Option<TableDef>>;

    fn execute_sql(&mut self, sql: &str) -> Result<()>;

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn apply(&mut self, change: &SchemaChange) -> Result<()> {
        execute_change(self, change)
    }
}

/// Render `change` for the executor's backend and run the statements.
///
/// Rebuilds that cannot run in place reflect the current table first and
/// go through the copy-and-swap statements.
pub fn execute_change<E>(executor: &mut E, change: &SchemaChange) -> Result<()>
where
    E: SchemaExecutor + ?Sized,
{
    let statements = match change {
        SchemaChange::Rebuild {
            table,
            edits,
            strategy,
        } if needs_rebuild(executor.backend(), edits, *strategy) => {
            let current = executor.describe_table(table)?.ok_or_else(|| {
                MigrationError::SchemaConflict(format!("table {} does not exist", table))
            })?;
            let plan = TableRebuild::plan(&current, edits)?;
            executor.backend().rebuild_sql(&plan)
        }
        other => executor.backend().render(other)?,
    };

    for sql in &statements {
        executor.execute_sql(sql)?;
    }

    Ok(())
}

fn needs_rebuild(backend: &dyn Backend, edits: &[ColumnEdit], strategy: RebuildStrategy) -> bool {
    strategy == RebuildStrategy::Always || !edits.iter().all(|e| backend.supports_in_place(e))
}
