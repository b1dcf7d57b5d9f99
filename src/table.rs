use crate::change::ColumnEdit;
use crate::column::{Column, ColumnType};
use crate::error::{MigrationError, Result};

/// Structural definition of one table: its name and ordered columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<Column>,
    /// Composite primary key in key order. Empty when the key, if any, is
    /// declared on a single column.
    pub primary_key: Vec<String>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Build a reflected table. `key` lists the primary key columns in key
    /// order; one column keeps the per-column flag, more become a table key.
    pub fn reflected(name: &str, mut columns: Vec<Column>, key: Vec<String>) -> Self {
        let primary_key = if key.len() > 1 {
            for column in columns.iter_mut().filter(|c| key.contains(&c.name)) {
                column.primary_key = false;
            }
            key
        } else {
            Vec::new()
        };

        Self {
            name: name.to_string(),
            columns,
            primary_key,
        }
    }

    pub fn composite_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type));
        self
    }

    pub fn add_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Apply a single column edit, failing with `SchemaConflict` when the
    /// edit targets a missing column or would duplicate an existing one.
    pub fn apply(&mut self, edit: &ColumnEdit) -> Result<()> {
        match edit {
            ColumnEdit::Add(column) => {
                if self.get(&column.name).is_some() {
                    return Err(self.conflict(&column.name, "already exists"));
                }
                self.columns.push(column.clone());
            }
            ColumnEdit::Drop { name, .. } => {
                let pos = self
                    .position(name)
                    .ok_or_else(|| self.conflict(name, "does not exist"))?;
                self.columns.remove(pos);
                self.primary_key.retain(|key| key != name);
            }
            ColumnEdit::Rename { from, to } => {
                if self.get(to).is_some() {
                    return Err(self.conflict(to, "already exists"));
                }
                let pos = self
                    .position(from)
                    .ok_or_else(|| self.conflict(from, "does not exist"))?;
                self.columns[pos].name = to.clone();
                for key in self.primary_key.iter_mut().filter(|key| key.as_str() == from.as_str()) {
                    *key = to.clone();
                }
            }
            ColumnEdit::Alter { name, changes, .. } => {
                let pos = self
                    .position(name)
                    .ok_or_else(|| self.conflict(name, "does not exist"))?;
                changes.apply_to(&mut self.columns[pos]);
            }
        }
        Ok(())
    }

    fn conflict(&self, column: &str, what: &str) -> MigrationError {
        MigrationError::SchemaConflict(format!("column {}.{} {}", self.name, column, what))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ColumnChanges;

    fn articles() -> TableDef {
        TableDef::new("articles")
            .add_column(Column::new("id", ColumnType::Serial).primary_key())
            .column("title", ColumnType::Text)
    }

    #[test]
    fn builder_keeps_column_order() {
        let table = articles().column("body", ColumnType::Text);
        assert_eq!(table.column_names(), vec!["id", "title", "body"]);
        assert_eq!(table.position("body"), Some(2));
    }

    #[test]
    fn add_appends_column() {
        let mut table = articles();
        table
            .apply(&ColumnEdit::Add(Column::new(
                "quality_metrics",
                ColumnType::Json,
            )))
            .unwrap();

        assert_eq!(table.column_names(), vec!["id", "title", "quality_metrics"]);
    }

    #[test]
    fn add_existing_column_conflicts() {
        let mut table = articles();
        let err = table
            .apply(&ColumnEdit::Add(Column::new("title", ColumnType::Text)))
            .unwrap_err();

        assert_eq!(
            err,
            MigrationError::SchemaConflict("column articles.title already exists".to_string())
        );
    }

    #[test]
    fn drop_missing_column_conflicts() {
        let mut table = articles();
        let err = table
            .apply(&ColumnEdit::Drop {
                name: "quality_metrics".to_string(),
                restore: None,
            })
            .unwrap_err();

        assert!(matches!(err, MigrationError::SchemaConflict(_)));
    }

    #[test]
    fn add_then_drop_restores_table() {
        let original = articles();
        let mut table = original.clone();
        let edit = ColumnEdit::Add(Column::new("quality_metrics", ColumnType::Json));

        table.apply(&edit).unwrap();
        table.apply(&edit.inverse().unwrap()).unwrap();

        assert_eq!(table, original);
    }

    #[test]
    fn rename_onto_existing_column_conflicts() {
        let mut table = articles();
        let err = table
            .apply(&ColumnEdit::Rename {
                from: "id".to_string(),
                to: "title".to_string(),
            })
            .unwrap_err();

        assert!(matches!(err, MigrationError::SchemaConflict(_)));
    }

    #[test]
    fn rename_follows_composite_key() {
        let mut table = TableDef::new("article_tags")
            .add_column(Column::new("article_id", ColumnType::Integer).not_null())
            .add_column(Column::new("tag", ColumnType::Text).not_null())
            .composite_key(["article_id", "tag"]);

        table
            .apply(&ColumnEdit::Rename {
                from: "tag".to_string(),
                to: "label".to_string(),
            })
            .unwrap();
        assert_eq!(table.primary_key, vec!["article_id", "label"]);
    }

    #[test]
    fn reflected_single_key_stays_on_column() {
        let columns = vec![Column::new("id", ColumnType::Integer).primary_key()];
        let table = TableDef::reflected("articles", columns, vec!["id".to_string()]);

        assert!(table.primary_key.is_empty());
        assert!(table.get("id").unwrap().primary_key);
    }

    #[test]
    fn alter_updates_definition() {
        let mut table = articles();
        table
            .apply(&ColumnEdit::Alter {
                name: "title".to_string(),
                changes: ColumnChanges::new()
                    .set_type(ColumnType::VarChar(200))
                    .set_nullable(false),
                reverse: None,
            })
            .unwrap();

        let title = table.get("title").unwrap();
        assert_eq!(title.column_type, ColumnType::VarChar(200));
        assert!(!title.nullable);
    }
}
