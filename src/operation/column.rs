use crate::change::{ColumnChanges, ColumnEdit, SchemaChange};
use crate::column::{Column, ColumnType};
use crate::operation::Operation;

fn alter(table: &str, edit: ColumnEdit) -> SchemaChange {
    SchemaChange::Alter {
        table: table.to_string(),
        edit,
    }
}

#[derive(Debug, Clone)]
pub struct AddColumn {
    pub table: String,
    pub column: Column,
}

impl AddColumn {
    pub fn new(table: impl Into<String>, column: Column) -> Self {
        Self {
            table: table.into(),
            column,
        }
    }

    fn edit(&self) -> ColumnEdit {
        ColumnEdit::Add(self.column.clone())
    }
}

impl Operation for AddColumn {
    fn forward(&self) -> Vec<SchemaChange> {
        vec![alter(&self.table, self.edit())]
    }

    fn backward(&self) -> Option<Vec<SchemaChange>> {
        self.edit()
            .inverse()
            .map(|edit| vec![alter(&self.table, edit)])
    }

    fn describe(&self) -> String {
        format!("Add column {} to {}", self.column.name, self.table)
    }
}

#[derive(Debug, Clone)]
pub struct DropColumn {
    pub table: String,
    pub column_name: String,
    pub column: Option<Column>,
}

impl DropColumn {
    pub fn new(table: impl Into<String>, column_name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column_name: column_name.into(),
            column: None,
        }
    }

    /// Remember the dropped definition so the drop can be reverted.
    pub fn with_definition(mut self, column: Column) -> Self {
        self.column = Some(column);
        self
    }

    fn edit(&self) -> ColumnEdit {
        ColumnEdit::Drop {
            name: self.column_name.clone(),
            restore: self.column.clone(),
        }
    }
}

impl Operation for DropColumn {
    fn forward(&self) -> Vec<SchemaChange> {
        vec![alter(&self.table, self.edit())]
    }

    fn backward(&self) -> Option<Vec<SchemaChange>> {
        self.edit()
            .inverse()
            .map(|edit| vec![alter(&self.table, edit)])
    }

    fn describe(&self) -> String {
        format!("Drop column {} from {}", self.column_name, self.table)
    }

    fn is_reversible(&self) -> bool {
        self.column.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RenameColumn {
    pub table: String,
    pub old_name: String,
    pub new_name: String,
}

impl RenameColumn {
    pub fn new(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }
}

impl Operation for RenameColumn {
    fn forward(&self) -> Vec<SchemaChange> {
        vec![alter(
            &self.table,
            ColumnEdit::Rename {
                from: self.old_name.clone(),
                to: self.new_name.clone(),
            },
        )]
    }

    fn backward(&self) -> Option<Vec<SchemaChange>> {
        Some(vec![alter(
            &self.table,
            ColumnEdit::Rename {
                from: self.new_name.clone(),
                to: self.old_name.clone(),
            },
        )])
    }

    fn describe(&self) -> String {
        format!(
            "Rename column {} to {} on {}",
            self.old_name, self.new_name, self.table
        )
    }
}

#[derive(Debug, Clone)]
pub struct AlterColumn {
    pub table: String,
    pub column_name: String,
    pub changes: ColumnChanges,
    pub reverse_changes: Option<ColumnChanges>,
}

impl AlterColumn {
    pub fn new(table: impl Into<String>, column_name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column_name: column_name.into(),
            changes: ColumnChanges::new(),
            reverse_changes: None,
        }
    }

    pub fn set_type(mut self, column_type: ColumnType) -> Self {
        self.changes.column_type = Some(column_type);
        self
    }

    pub fn set_nullable(mut self, nullable: bool) -> Self {
        self.changes.nullable = Some(nullable);
        self
    }

    pub fn set_default(mut self, expression: impl Into<String>) -> Self {
        self.changes.default = Some(Some(expression.into()));
        self
    }

    pub fn drop_default(mut self) -> Self {
        self.changes.default = Some(None);
        self
    }

    pub fn with_reverse(mut self, reverse_changes: ColumnChanges) -> Self {
        self.reverse_changes = Some(reverse_changes);
        self
    }

    fn edit(&self) -> ColumnEdit {
        ColumnEdit::Alter {
            name: self.column_name.clone(),
            changes: self.changes.clone(),
            reverse: self.reverse_changes.clone(),
        }
    }
}

impl Operation for AlterColumn {
    fn forward(&self) -> Vec<SchemaChange> {
        vec![alter(&self.table, self.edit())]
    }

    fn backward(&self) -> Option<Vec<SchemaChange>> {
        self.edit()
            .inverse()
            .map(|edit| vec![alter(&self.table, edit)])
    }

    fn describe(&self) -> String {
        format!("Alter column {} on {}", self.column_name, self.table)
    }

    fn is_reversible(&self) -> bool {
        self.reverse_changes.is_some()
    }
}
