use crate::change::{ColumnChanges, ColumnEdit, RebuildStrategy, SchemaChange};
use crate::column::Column;
use crate::operation::Operation;

/// Column edits on one table, run through the rebuild strategy.
///
/// Engines that cannot alter a column in place (SQLite) get the whole table
/// copied into a new one with the edits applied. Other engines run the edits
/// as ordinary `ALTER TABLE` statements unless [`BatchAlterTable::recreate_always`]
/// is set.
#[derive(Debug, Clone)]
pub struct BatchAlterTable {
    pub table: String,
    pub edits: Vec<ColumnEdit>,
    pub strategy: RebuildStrategy,
}

impl BatchAlterTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            edits: Vec::new(),
            strategy: RebuildStrategy::Auto,
        }
    }

    pub fn recreate_always(mut self) -> Self {
        self.strategy = RebuildStrategy::Always;
        self
    }

    pub fn add_column(mut self, column: Column) -> Self {
        self.edits.push(ColumnEdit::Add(column));
        self
    }

    pub fn drop_column(mut self, name: impl Into<String>) -> Self {
        self.edits.push(ColumnEdit::Drop {
            name: name.into(),
            restore: None,
        });
        self
    }

    /// Drop a column, keeping its definition so the batch stays reversible.
    pub fn drop_column_with_definition(mut self, column: Column) -> Self {
        self.edits.push(ColumnEdit::Drop {
            name: column.name.clone(),
            restore: Some(column),
        });
        self
    }

    pub fn rename_column(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edits.push(ColumnEdit::Rename {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn alter_column(mut self, name: impl Into<String>, changes: ColumnChanges) -> Self {
        self.edits.push(ColumnEdit::Alter {
            name: name.into(),
            changes,
            reverse: None,
        });
        self
    }

    pub fn alter_column_reversible(
        mut self,
        name: impl Into<String>,
        changes: ColumnChanges,
        reverse: ColumnChanges,
    ) -> Self {
        self.edits.push(ColumnEdit::Alter {
            name: name.into(),
            changes,
            reverse: Some(reverse),
        });
        self
    }
}

impl Operation for BatchAlterTable {
    fn forward(&self) -> Vec<SchemaChange> {
        vec![SchemaChange::Rebuild {
            table: self.table.clone(),
            edits: self.edits.clone(),
            strategy: self.strategy,
        }]
    }

    fn backward(&self) -> Option<Vec<SchemaChange>> {
        let edits = self
            .edits
            .iter()
            .rev()
            .map(ColumnEdit::inverse)
            .collect::<Option<Vec<_>>>()?;

        Some(vec![SchemaChange::Rebuild {
            table: self.table.clone(),
            edits,
            strategy: self.strategy,
        }])
    }

    fn describe(&self) -> String {
        format!("Batch alter table {} ({} edits)", self.table, self.edits.len())
    }

    fn is_reversible(&self) -> bool {
        self.edits.iter().all(ColumnEdit::is_reversible)
    }
}
