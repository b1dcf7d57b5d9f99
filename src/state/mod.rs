//! Where the currently applied revision is persisted.

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "mysql")]
mod mysql;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRevisionStore;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresRevisionStore;

#[cfg(feature = "mysql")]
pub use self::mysql::MySqlRevisionStore;

use crate::error::Result;

#[cfg(any(feature = "sqlite", feature = "postgres", feature = "mysql"))]
pub(crate) const DEFAULT_TABLE_NAME: &str = "schema_revision";

/// Holds the head revision of a database. `None` means nothing is applied.
pub trait RevisionStore {
    fn current(&mut self) -> Result<Option<String>>;
    fn set_current(&mut self, revision: Option<&str>) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRevision {
    current: Option<String>,
}

impl InMemoryRevision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(revision: impl Into<String>) -> Self {
        Self {
            current: Some(revision.into()),
        }
    }
}

impl RevisionStore for InMemoryRevision {
    fn current(&mut self) -> Result<Option<String>> {
        Ok(self.current.clone())
    }

    fn set_current(&mut self, revision: Option<&str>) -> Result<()> {
        self.current = revision.map(str::to_string);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_base() {
        let mut store = InMemoryRevision::new();
        assert_eq!(store.current().unwrap(), None);
    }

    #[test]
    fn set_and_clear() {
        let mut store = InMemoryRevision::at("a660e15c1b8b");
        assert_eq!(store.current().unwrap().as_deref(), Some("a660e15c1b8b"));

        store.set_current(Some("1c2f3e4d5a6b")).unwrap();
        assert_eq!(store.current().unwrap().as_deref(), Some("1c2f3e4d5a6b"));

        store.set_current(None).unwrap();
        assert_eq!(store.current().unwrap(), None);
    }
}
