mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use sea_query::backend::SchemaBuilder;
use sea_query::{
    Alias, ColumnDef, Expr, Index, Table, TableAlterStatement, TableCreateStatement,
    TableDropStatement, TableRenameStatement,
};

use crate::change::{ColumnChanges, ColumnEdit, RebuildStrategy, SchemaChange, TableRebuild};
use crate::column::{Column, ColumnType};
use crate::error::{MigrationError, Result};
use crate::table::TableDef;

const STAGING_PREFIX: &str = "_rechain_tmp_";

/// A sea-query schema statement waiting for a backend's builder.
#[derive(Debug, Clone)]
pub enum Ddl {
    Create(TableCreateStatement),
    Drop(TableDropStatement),
    Rename(TableRenameStatement),
    Alter(TableAlterStatement),
}

impl Ddl {
    pub fn build<B: SchemaBuilder>(&self, builder: B) -> String {
        match self {
            Ddl::Create(stmt) => stmt.to_string(builder),
            Ddl::Drop(stmt) => stmt.to_string(builder),
            Ddl::Rename(stmt) => stmt.to_string(builder),
            Ddl::Alter(stmt) => stmt.to_string(builder),
        }
    }
}

pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;
    fn supports_alter_column(&self) -> bool;
    fn supports_drop_column(&self) -> bool;
    fn supports_transactional_ddl(&self) -> bool;

    fn build(&self, ddl: &Ddl) -> String;

    fn quote_identifier(&self, name: &str) -> String;

    /// Whether `edit` can run as a plain `ALTER TABLE` on this engine.
    fn supports_in_place(&self, edit: &ColumnEdit) -> bool {
        match edit {
            ColumnEdit::Add(_) | ColumnEdit::Rename { .. } => true,
            ColumnEdit::Drop { .. } => self.supports_drop_column(),
            ColumnEdit::Alter { .. } => self.supports_alter_column(),
        }
    }

    /// Render a change to DDL. A `Rebuild` only renders here when it can run
    /// in place; a real copy-and-swap goes through [`Backend::rebuild_sql`]
    /// with the reflected table.
    fn render(&self, change: &SchemaChange) -> Result<Vec<String>> {
        match change {
            SchemaChange::CreateTable(def) => Ok(vec![self.create_table_sql(def)]),
            SchemaChange::DropTable(name) => Ok(vec![self.drop_table_sql(name)]),
            SchemaChange::Alter { table, edit } => self.alter_sql(table, edit),
            SchemaChange::Rebuild {
                table,
                edits,
                strategy,
            } => {
                if *strategy == RebuildStrategy::Auto
                    && edits.iter().all(|e| self.supports_in_place(e))
                {
                    let mut sql = Vec::new();
                    for edit in edits {
                        sql.extend(self.alter_sql(table, edit)?);
                    }
                    Ok(sql)
                } else {
                    Err(MigrationError::UnsupportedOperation {
                        backend: self.name().to_string(),
                        detail: format!("rebuilding {} needs the current table definition", table),
                    })
                }
            }
        }
    }

    fn alter_sql(&self, table: &str, edit: &ColumnEdit) -> Result<Vec<String>> {
        if !self.supports_in_place(edit) {
            return Err(MigrationError::UnsupportedOperation {
                backend: self.name().to_string(),
                detail: format!(
                    "{} requires a table rebuild; run it inside a batch",
                    edit.describe(table)
                ),
            });
        }

        match edit {
            ColumnEdit::Add(column) => Ok(vec![self.add_column_sql(table, column)]),
            ColumnEdit::Drop { name, .. } => Ok(vec![self.drop_column_sql(table, name)]),
            ColumnEdit::Rename { from, to } => Ok(vec![self.rename_column_sql(table, from, to)]),
            ColumnEdit::Alter { name, changes, .. } => {
                self.alter_column_sql(table, name, changes)
            }
        }
    }

    fn create_table_sql(&self, def: &TableDef) -> String {
        let mut stmt = Table::create();
        stmt.table(Alias::new(&def.name));

        for column in &def.columns {
            stmt.col(column_to_def(column));
        }

        if !def.primary_key.is_empty() {
            let mut key = Index::create();
            for column in &def.primary_key {
                key.col(Alias::new(column));
            }
            stmt.primary_key(&mut key);
        }

        self.build(&Ddl::Create(stmt))
    }

    fn drop_table_sql(&self, name: &str) -> String {
        let stmt = Table::drop().table(Alias::new(name)).to_owned();
        self.build(&Ddl::Drop(stmt))
    }

    fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        let stmt = Table::rename()
            .table(Alias::new(old_name), Alias::new(new_name))
            .to_owned();
        self.build(&Ddl::Rename(stmt))
    }

    fn add_column_sql(&self, table: &str, column: &Column) -> String {
        let stmt = Table::alter()
            .table(Alias::new(table))
            .add_column(column_to_def(column))
            .to_owned();
        self.build(&Ddl::Alter(stmt))
    }

    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        let stmt = Table::alter()
            .table(Alias::new(table))
            .drop_column(Alias::new(column))
            .to_owned();
        self.build(&Ddl::Alter(stmt))
    }

    fn rename_column_sql(&self, table: &str, old_name: &str, new_name: &str) -> String {
        let stmt = Table::alter()
            .table(Alias::new(table))
            .rename_column(Alias::new(old_name), Alias::new(new_name))
            .to_owned();
        self.build(&Ddl::Alter(stmt))
    }

    fn alter_column_sql(
        &self,
        table: &str,
        column: &str,
        changes: &ColumnChanges,
    ) -> Result<Vec<String>> {
        Ok(modify_column_sql(self, table, column, changes))
    }

    /// Copy-and-swap: create a staging table with the target shape, copy the
    /// carried columns, drop the original and rename the staging table.
    fn rebuild_sql(&self, rebuild: &TableRebuild) -> Vec<String> {
        let staging = format!("{}{}", STAGING_PREFIX, rebuild.target.name);
        let mut staged = rebuild.target.clone();
        staged.name = staging.clone();

        let mut sql = vec![self.create_table_sql(&staged)];

        if !rebuild.carried.is_empty() {
            let (sources, targets): (Vec<String>, Vec<String>) = rebuild
                .carried
                .iter()
                .map(|(from, to)| (self.quote_identifier(from), self.quote_identifier(to)))
                .unzip();
            sql.push(format!(
                "INSERT INTO {} ({}) SELECT {} FROM {}",
                self.quote_identifier(&staging),
                targets.join(", "),
                sources.join(", "),
                self.quote_identifier(&rebuild.source.name)
            ));
        }

        sql.extend(self.before_swap_sql(rebuild, &staging));
        sql.push(self.drop_table_sql(&rebuild.source.name));
        sql.push(self.rename_table_sql(&staging, &rebuild.target.name));
        sql
    }

    /// Statements run once rows are copied and before the source table is
    /// dropped, for objects the staging table has to take over.
    fn before_swap_sql(&self, _rebuild: &TableRebuild, _staging: &str) -> Vec<String> {
        Vec::new()
    }
}

pub(crate) fn modify_column_sql<B: Backend + ?Sized>(
    backend: &B,
    table: &str,
    column: &str,
    changes: &ColumnChanges,
) -> Vec<String> {
    let mut sql = Vec::new();
    let sets_default = matches!(changes.default, Some(Some(_)));

    if changes.column_type.is_some() || changes.nullable.is_some() || sets_default {
        let mut col = ColumnDef::new(Alias::new(column));

        if let Some(ref column_type) = changes.column_type {
            apply_column_type(&mut col, column_type);
        }

        if let Some(nullable) = changes.nullable {
            if nullable {
                col.null();
            } else {
                col.not_null();
            }
        }

        if let Some(Some(ref default)) = changes.default {
            col.default(Expr::cust(default));
        }

        let stmt = Table::alter()
            .table(Alias::new(table))
            .modify_column(col)
            .to_owned();
        sql.push(backend.build(&Ddl::Alter(stmt)));
    }

    if let Some(None) = changes.default {
        sql.push(format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
            backend.quote_identifier(table),
            backend.quote_identifier(column)
        ));
    }

    sql
}

fn column_to_def(column: &Column) -> ColumnDef {
    let mut col = ColumnDef::new(Alias::new(&column.name));

    apply_column_type(&mut col, &column.column_type);

    if column.primary_key {
        col.primary_key();
        if column.column_type.is_serial() {
            col.auto_increment();
        }
    }

    if !column.nullable && !column.primary_key {
        col.not_null();
    }

    if column.unique && !column.primary_key {
        col.unique_key();
    }

    if let Some(ref default) = column.default {
        col.default(Expr::cust(default));
    }

    col
}

fn apply_column_type(col: &mut ColumnDef, column_type: &ColumnType) {
    match column_type {
        ColumnType::Serial | ColumnType::Integer => {
            col.integer();
        }
        ColumnType::BigSerial | ColumnType::BigInt => {
            col.big_integer();
        }
        ColumnType::SmallInt => {
            col.small_integer();
        }
        ColumnType::Text => {
            col.text();
        }
        ColumnType::VarChar(len) => {
            col.string_len(*len);
        }
        ColumnType::Boolean => {
            col.boolean();
        }
        ColumnType::Timestamp => {
            col.timestamp();
        }
        ColumnType::TimestampTz => {
            col.timestamp_with_time_zone();
        }
        ColumnType::Date => {
            col.date();
        }
        ColumnType::Time => {
            col.time();
        }
        ColumnType::Uuid => {
            col.uuid();
        }
        ColumnType::Json => {
            col.json();
        }
        ColumnType::JsonB => {
            col.json_binary();
        }
        ColumnType::Binary => {
            col.binary();
        }
        ColumnType::Real => {
            col.float();
        }
        ColumnType::DoublePrecision => {
            col.double();
        }
        ColumnType::Decimal { precision, scale } => {
            col.decimal_len(*precision as u32, *scale as u32);
        }
        ColumnType::Custom(declared) => {
            col.custom(Alias::new(declared));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn newsletters() -> TableDef {
        TableDef::new("newsletters")
            .add_column(Column::new("id", ColumnType::Serial).primary_key())
            .add_column(Column::new("subject", ColumnType::Text).not_null())
            .column("legacy_summary", ColumnType::Text)
    }

    #[test]
    fn render_rejects_in_place_alter_without_support() {
        let change = SchemaChange::Alter {
            table: "newsletters".to_string(),
            edit: ColumnEdit::Alter {
                name: "subject".to_string(),
                changes: ColumnChanges::new().set_nullable(true),
                reverse: None,
            },
        };

        let err = Sqlite.render(&change).unwrap_err();
        assert_eq!(
            err,
            MigrationError::UnsupportedOperation {
                backend: "sqlite".to_string(),
                detail: "Alter column subject on newsletters requires a table rebuild; run it inside a batch"
                    .to_string(),
            }
        );
        assert!(Postgres.render(&change).is_ok());
    }

    #[test]
    fn auto_rebuild_renders_in_place_when_supported() {
        let change = SchemaChange::Rebuild {
            table: "newsletters".to_string(),
            edits: vec![
                ColumnEdit::Add(Column::new("tts_provider", ColumnType::VarChar(50))),
                ColumnEdit::Alter {
                    name: "subject".to_string(),
                    changes: ColumnChanges::new().set_nullable(true),
                    reverse: None,
                },
            ],
            strategy: RebuildStrategy::Auto,
        };

        let sql = Postgres.render(&change).unwrap();
        assert_eq!(sql.len(), 2);
        assert!(sql[0].contains("ADD COLUMN \"tts_provider\""));
        assert!(sql[1].contains("\"subject\""));

        assert!(matches!(
            Sqlite.render(&change),
            Err(MigrationError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn always_rebuild_never_renders_in_place() {
        let change = SchemaChange::Rebuild {
            table: "newsletters".to_string(),
            edits: vec![ColumnEdit::Add(Column::new("x", ColumnType::Text))],
            strategy: RebuildStrategy::Always,
        };
        assert!(matches!(
            Postgres.render(&change),
            Err(MigrationError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn rebuild_sql_copies_and_swaps() {
        let plan = TableRebuild::plan(
            &newsletters(),
            &[
                ColumnEdit::Drop {
                    name: "legacy_summary".to_string(),
                    restore: None,
                },
                ColumnEdit::Alter {
                    name: "subject".to_string(),
                    changes: ColumnChanges::new().set_nullable(true),
                    reverse: None,
                },
            ],
        )
        .unwrap();

        let sql = Sqlite.rebuild_sql(&plan);
        assert_eq!(sql.len(), 4);
        assert!(sql[0].starts_with("CREATE TABLE \"_rechain_tmp_newsletters\""));
        assert!(!sql[0].contains("legacy_summary"));
        assert_eq!(
            sql[1],
            "INSERT INTO \"_rechain_tmp_newsletters\" (\"id\", \"subject\") SELECT \"id\", \"subject\" FROM \"newsletters\""
        );
        assert_eq!(sql[2], "DROP TABLE \"newsletters\"");
        assert_eq!(
            sql[3],
            "ALTER TABLE \"_rechain_tmp_newsletters\" RENAME TO \"newsletters\""
        );
    }

    #[test]
    fn composite_key_renders_once() {
        let tags = TableDef::new("article_tags")
            .add_column(Column::new("article_id", ColumnType::Integer).not_null())
            .add_column(Column::new("tag", ColumnType::Text).not_null())
            .column("note", ColumnType::Text)
            .composite_key(["article_id", "tag"]);

        let sql = Sqlite.create_table_sql(&tags);
        assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
        assert!(sql.contains("PRIMARY KEY (\"article_id\", \"tag\")"));
    }

    #[test]
    fn rebuild_without_carried_columns_skips_copy() {
        let source = TableDef::new("scratch").column("only", ColumnType::Text);
        let plan = TableRebuild::plan(
            &source,
            &[ColumnEdit::Drop {
                name: "only".to_string(),
                restore: None,
            }],
        )
        .unwrap();

        let sql = Sqlite.rebuild_sql(&plan);
        assert_eq!(sql.len(), 3);
        assert!(sql.iter().all(|s| !s.starts_with("INSERT")));
    }

    #[test]
    fn modify_column_drops_default_separately() {
        let sql = modify_column_sql(
            &Postgres,
            "podcast_generations",
            "status",
            &ColumnChanges::new().drop_default(),
        );
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"podcast_generations\" ALTER COLUMN \"status\" DROP DEFAULT"
                    .to_string()
            ]
        );
    }

    #[test]
    fn custom_type_is_rendered_verbatim() {
        let sql = Sqlite.add_column_sql(
            "articles",
            &Column::new("score", ColumnType::custom("NUMERIC(5,2)")),
        );
        assert!(sql.contains("NUMERIC(5,2)"));
    }
}
