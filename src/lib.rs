pub mod backend;
pub mod change;
pub mod column;
pub mod config;
pub mod error;
pub mod executor;
pub mod migration;
pub mod migrator;
pub mod operation;
pub mod state;
pub mod table;
pub mod throttle;

pub mod prelude {
    pub use crate::backend::{Backend, MySql, Postgres, Sqlite};
    pub use crate::change::{ColumnChanges, ColumnEdit, RebuildStrategy, SchemaChange};
    pub use crate::column::{Column, ColumnType};
    pub use crate::config::{BackendKind, ConfigError, MigratorConfig, RateLimitConfig};
    pub use crate::error::{MigrationError, Result};
    pub use crate::executor::{SchemaCatalog, SchemaExecutor};
    pub use crate::migration::{Direction, Migration, MigrationPath, RevisionChain};
    pub use crate::migrator::{Migrator, Target};
    pub use crate::operation::{
        AddColumn, AlterColumn, BatchAlterTable, CreateTable, DropColumn, DropTable, Operation,
        RenameColumn,
    };
    pub use crate::state::{InMemoryRevision, RevisionStore};
    pub use crate::table::TableDef;
    pub use crate::throttle::{Permissive, RateDecision, RateLimiter, RealCount};

    #[cfg(feature = "sqlite")]
    pub use crate::executor::SqliteExecutor;
    #[cfg(feature = "sqlite")]
    pub use crate::state::SqliteRevisionStore;

    #[cfg(feature = "postgres")]
    pub use crate::executor::PostgresExecutor;
    #[cfg(feature = "postgres")]
    pub use crate::state::PostgresRevisionStore;

    #[cfg(feature = "mysql")]
    pub use crate::executor::MySqlExecutor;
    #[cfg(feature = "mysql")]
    pub use crate::state::MySqlRevisionStore;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    fn newsroom() -> RevisionChain {
        let mut chain = RevisionChain::new();

        chain
            .register(
                Migration::new("0001").message("create articles").operation(
                    CreateTable::new("articles")
                        .add_column(Column::new("id", ColumnType::Serial).primary_key())
                        .add_column(Column::new("title", ColumnType::Text).not_null())
                        .add_column(
                            Column::new("status", ColumnType::VarChar(20))
                                .not_null()
                                .default("'draft'"),
                        ),
                ),
            )
            .unwrap();

        chain
            .register(
                Migration::new("0002")
                    .parent("0001")
                    .message("create newsletters")
                    .operation(
                        CreateTable::new("newsletters")
                            .add_column(Column::new("id", ColumnType::Serial).primary_key())
                            .column("subject", ColumnType::Text),
                    ),
            )
            .unwrap();

        chain
            .register(
                Migration::new("0003")
                    .parent("0002")
                    .message("relax article status")
                    .operation(
                        BatchAlterTable::new("articles").alter_column_reversible(
                            "status",
                            ColumnChanges::new()
                                .set_type(ColumnType::VarChar(20))
                                .set_nullable(true)
                                .drop_default(),
                            ColumnChanges::new()
                                .set_type(ColumnType::VarChar(20))
                                .set_nullable(false)
                                .set_default("'draft'"),
                        ),
                    ),
            )
            .unwrap();

        chain
    }

    #[test]
    fn full_migration_workflow() {
        let chain = newsroom();
        let mut migrator =
            Migrator::new(&chain, SchemaCatalog::new(&Sqlite), InMemoryRevision::new());

        assert_eq!(migrator.pending().unwrap(), vec!["0001", "0002", "0003"]);
        assert_eq!(migrator.upgrade().unwrap(), vec!["0001", "0002", "0003"]);

        let status = migrator
            .executor()
            .table("articles")
            .unwrap()
            .get("status")
            .unwrap()
            .clone();
        assert!(status.nullable);
        assert!(status.default.is_none());

        let statements = migrator.executor().statements();
        assert!(statements.iter().any(|s| s.contains("CREATE TABLE \"newsletters\"")));
        assert!(statements.iter().any(|s| s.contains("_rechain_tmp_articles")));
    }

    #[test]
    fn migration_rollback() {
        let chain = newsroom();
        let mut migrator =
            Migrator::new(&chain, SchemaCatalog::new(&Postgres), InMemoryRevision::new());

        migrator.upgrade().unwrap();
        let head_schema = migrator.executor().tables().clone();

        let reverted = migrator.downgrade(&Target::Base).unwrap();
        assert_eq!(reverted, vec!["0003", "0002", "0001"]);
        assert!(migrator.executor().tables().is_empty());

        migrator.upgrade().unwrap();
        assert_eq!(migrator.executor().tables(), &head_schema);
    }

    #[test]
    fn each_step_round_trips_on_every_backend() {
        let chain = newsroom();

        for backend in [&Sqlite as &dyn Backend, &Postgres, &MySql] {
            let mut catalog = SchemaCatalog::new(backend);
            for step in chain.history().unwrap() {
                let before = catalog.tables().clone();
                step.upgrade(&mut catalog).unwrap();
                step.downgrade(&mut catalog).unwrap();
                assert_eq!(catalog.tables(), &before, "{} on {}", step.revision, backend.name());
                step.upgrade(&mut catalog).unwrap();
            }
        }
    }
}
