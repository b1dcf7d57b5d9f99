use std::collections::BTreeMap;

use crate::backend::Backend;
use crate::change::{SchemaChange, TableRebuild};
use crate::error::{MigrationError, Result};
use crate::executor::{execute_change, SchemaExecutor};
use crate::table::TableDef;

/// In-memory schema catalog for one backend.
///
/// Applies changes structurally with the same conflict and capability rules
/// a real engine enforces, and records the SQL the backend would have run.
/// Useful for dry runs and offline SQL scripts.
#[derive(Clone)]
pub struct SchemaCatalog<'b> {
    backend: &'b dyn Backend,
    tables: BTreeMap<String, TableDef>,
    statements: Vec<String>,
    /// Tables and statement count at `begin`.
    snapshot: Option<(BTreeMap<String, TableDef>, usize)>,
}

impl std::fmt::Debug for SchemaCatalog<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCatalog")
            .field("backend", &self.backend.name())
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .field("statements", &self.statements.len())
            .finish()
    }
}

impl<'b> SchemaCatalog<'b> {
    pub fn new(backend: &'b dyn Backend) -> Self {
        Self {
            backend,
            tables: BTreeMap::new(),
            statements: Vec::new(),
            snapshot: None,
        }
    }

    pub fn with_table(mut self, def: TableDef) -> Self {
        self.tables.insert(def.name.clone(), def);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> &BTreeMap<String, TableDef> {
        &self.tables
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn take_statements(&mut self) -> Vec<String> {
        std::mem::take(&mut self.statements)
    }

    fn existing(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .get(name)
            .ok_or_else(|| MigrationError::SchemaConflict(format!("table {} does not exist", name)))
    }

    /// The table entry `change` produces: its name and new definition, or
    /// `None` when the table goes away.
    fn simulate(&self, change: &SchemaChange) -> Result<(String, Option<TableDef>)> {
        match change {
            SchemaChange::CreateTable(def) => {
                if self.tables.contains_key(&def.name) {
                    return Err(MigrationError::SchemaConflict(format!(
                        "table {} already exists",
                        def.name
                    )));
                }
                Ok((def.name.clone(), Some(def.clone())))
            }
            SchemaChange::DropTable(name) => {
                self.existing(name)?;
                Ok((name.clone(), None))
            }
            SchemaChange::Alter { table, edit } => {
                let mut def = self.existing(table)?.clone();
                def.apply(edit)?;
                Ok((table.clone(), Some(def)))
            }
            SchemaChange::Rebuild { table, edits, .. } => {
                let plan = TableRebuild::plan(self.existing(table)?, edits)?;
                Ok((table.clone(), Some(plan.target)))
            }
        }
    }
}

impl SchemaExecutor for SchemaCatalog<'_> {
    fn backend(&self) -> &dyn Backend {
        self.backend
    }

    fn describe_table(&mut self, name: &str) -> Result<Option<TableDef>> {
        Ok(self.tables.get(name).cloned())
    }

    fn execute_sql(&mut self, sql: &str) -> Result<()> {
        self.statements.push(sql.to_string());
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.snapshot = Some((self.tables.clone(), self.statements.len()));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some((tables, recorded)) = self.snapshot.take() {
            self.tables = tables;
            self.statements.truncate(recorded);
        }
        Ok(())
    }

    fn apply(&mut self, change: &SchemaChange) -> Result<()> {
        let (name, next) = self.simulate(change)?;
        execute_change(self, change)?;

        match next {
            Some(def) => {
                self.tables.insert(name, def);
            }
            None => {
                self.tables.remove(&name);
            }
        }
        Ok(())
    }
}
