use crate::change::SchemaChange;
use crate::column::{Column, ColumnType};
use crate::operation::Operation;
use crate::table::TableDef;

#[derive(Debug, Clone)]
pub struct CreateTable {
    pub table: TableDef,
}

impl CreateTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: TableDef::new(name),
        }
    }

    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.table = self.table.column(name, column_type);
        self
    }

    pub fn add_column(mut self, column: Column) -> Self {
        self.table = self.table.add_column(column);
        self
    }

    pub fn composite_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table = self.table.composite_key(columns);
        self
    }
}

impl Operation for CreateTable {
    fn forward(&self) -> Vec<SchemaChange> {
        vec![SchemaChange::CreateTable(self.table.clone())]
    }

    fn backward(&self) -> Option<Vec<SchemaChange>> {
        Some(vec![SchemaChange::DropTable(self.table.name.clone())])
    }

    fn describe(&self) -> String {
        format!("Create table {}", self.table.name)
    }
}

#[derive(Debug, Clone)]
pub struct DropTable {
    pub name: String,
    pub definition: Option<TableDef>,
}

impl DropTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: None,
        }
    }

    pub fn with_definition(mut self, definition: TableDef) -> Self {
        self.definition = Some(definition);
        self
    }
}

impl Operation for DropTable {
    fn forward(&self) -> Vec<SchemaChange> {
        vec![SchemaChange::DropTable(self.name.clone())]
    }

    fn backward(&self) -> Option<Vec<SchemaChange>> {
        self.definition
            .as_ref()
            .map(|def| vec![SchemaChange::CreateTable(def.clone())])
    }

    fn describe(&self) -> String {
        format!("Drop table {}", self.name)
    }

    fn is_reversible(&self) -> bool {
        self.definition.is_some()
    }
}
