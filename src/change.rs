//! Structural schema changes.
//!
//! Every operation lowers to a list of [`SchemaChange`]s. Backends render them
//! to DDL, and the in-memory catalog applies them directly.

use crate::column::{Column, ColumnType};
use crate::error::Result;
use crate::table::TableDef;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnChanges {
    pub column_type: Option<ColumnType>,
    pub nullable: Option<bool>,
    /// `Some(None)` drops the default.
    pub default: Option<Option<String>>,
}

impl ColumnChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    pub fn set_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn set_default(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(Some(expression.into()));
        self
    }

    pub fn drop_default(mut self) -> Self {
        self.default = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.column_type.is_none() && self.nullable.is_none() && self.default.is_none()
    }

    pub fn apply_to(&self, column: &mut Column) {
        if let Some(ref column_type) = self.column_type {
            column.column_type = column_type.clone();
        }
        if let Some(nullable) = self.nullable {
            column.nullable = nullable;
        }
        if let Some(ref default) = self.default {
            column.default = default.clone();
        }
    }
}

/// One change to a single column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnEdit {
    Add(Column),
    /// `restore` carries the dropped definition so the drop can be undone.
    Drop {
        name: String,
        restore: Option<Column>,
    },
    Rename {
        from: String,
        to: String,
    },
    Alter {
        name: String,
        changes: ColumnChanges,
        reverse: Option<ColumnChanges>,
    },
}

impl ColumnEdit {
    pub fn column_name(&self) -> &str {
        match self {
            ColumnEdit::Add(column) => &column.name,
            ColumnEdit::Drop { name, .. } => name,
            ColumnEdit::Rename { from, .. } => from,
            ColumnEdit::Alter { name, .. } => name,
        }
    }

    /// The edit that undoes this one, if enough is known to build it.
    pub fn inverse(&self) -> Option<ColumnEdit> {
        match self {
            ColumnEdit::Add(column) => Some(ColumnEdit::Drop {
                name: column.name.clone(),
                restore: Some(column.clone()),
            }),
            ColumnEdit::Drop { restore, .. } => restore.clone().map(ColumnEdit::Add),
            ColumnEdit::Rename { from, to } => Some(ColumnEdit::Rename {
                from: to.clone(),
                to: from.clone(),
            }),
            ColumnEdit::Alter {
                name,
                changes,
                reverse,
            } => reverse.as_ref().map(|reverse| ColumnEdit::Alter {
                name: name.clone(),
                changes: reverse.clone(),
                reverse: Some(changes.clone()),
            }),
        }
    }

    pub fn is_reversible(&self) -> bool {
        match self {
            ColumnEdit::Add(_) | ColumnEdit::Rename { .. } => true,
            ColumnEdit::Drop { restore, .. } => restore.is_some(),
            ColumnEdit::Alter { reverse, .. } => reverse.is_some(),
        }
    }

    pub fn describe(&self, table: &str) -> String {
        match self {
            ColumnEdit::Add(column) => format!("Add column {} to {}", column.name, table),
            ColumnEdit::Drop { name, .. } => format!("Drop column {} from {}", name, table),
            ColumnEdit::Rename { from, to } => {
                format!("Rename column {} to {} on {}", from, to, table)
            }
            ColumnEdit::Alter { name, .. } => format!("Alter column {} on {}", name, table),
        }
    }
}

/// How a batch of column edits reaches the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RebuildStrategy {
    /// Alter in place when the backend can run every edit that way,
    /// otherwise rebuild the table.
    #[default]
    Auto,
    /// Always copy the table into a new one with the edits applied.
    Always,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    CreateTable(TableDef),
    DropTable(String),
    Alter {
        table: String,
        edit: ColumnEdit,
    },
    Rebuild {
        table: String,
        edits: Vec<ColumnEdit>,
        strategy: RebuildStrategy,
    },
}

impl SchemaChange {
    pub fn table(&self) -> &str {
        match self {
            SchemaChange::CreateTable(def) => &def.name,
            SchemaChange::DropTable(name) => name,
            SchemaChange::Alter { table, .. } => table,
            SchemaChange::Rebuild { table, .. } => table,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SchemaChange::CreateTable(def) => format!("Create table {}", def.name),
            SchemaChange::DropTable(name) => format!("Drop table {}", name),
            SchemaChange::Alter { table, edit } => edit.describe(table),
            SchemaChange::Rebuild { table, edits, .. } => {
                format!("Rebuild table {} ({} edits)", table, edits.len())
            }
        }
    }
}

/// Copy-and-swap plan for engines that cannot alter a table in place.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRebuild {
    pub source: TableDef,
    pub target: TableDef,
    /// `(source column, target column)` pairs whose data is copied across.
    pub carried: Vec<(String, String)>,
}

impl TableRebuild {
    pub fn plan(source: &TableDef, edits: &[ColumnEdit]) -> Result<Self> {
        let mut target = source.clone();
        let mut origins: Vec<Option<String>> = source
            .columns
            .iter()
            .map(|c| Some(c.name.clone()))
            .collect();

        for edit in edits {
            let dropped = match edit {
                ColumnEdit::Drop { name, .. } => target.position(name),
                _ => None,
            };

            target.apply(edit)?;

            match edit {
                ColumnEdit::Add(_) => origins.push(None),
                ColumnEdit::Drop { .. } => {
                    if let Some(pos) = dropped {
                        origins.remove(pos);
                    }
                }
                ColumnEdit::Rename { .. } | ColumnEdit::Alter { .. } => {}
            }
        }

        let carried = target
            .columns
            .iter()
            .zip(origins)
            .filter_map(|(column, origin)| origin.map(|from| (from, column.name.clone())))
            .collect();

        Ok(Self {
            source: source.clone(),
            target,
            carried,
        })
    }
}
