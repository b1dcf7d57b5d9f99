use thiserror::Error;

pub type Result<T, E = MigrationError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MigrationError {
    #[error("Unknown revision: {0}")]
    UnknownRevision(String),

    #[error("No path between revisions {from} and {to}")]
    DisconnectedChain { from: String, to: String },

    #[error("Invalid migration target: {0}")]
    InvalidTarget(String),

    #[error("Duplicate revision: {0}")]
    DuplicateRevision(String),

    #[error("Circular parent chain detected at: {0}")]
    CircularChain(String),

    #[error("Multiple heads: {}", .0.join(", "))]
    MultipleHeads(Vec<String>),

    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    #[error("Unsupported operation on {backend}: {detail}")]
    UnsupportedOperation { backend: String, detail: String },

    #[error("Migration is not reversible: {0}")]
    NotReversible(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Revision store error: {0}")]
    State(String),

    /// A step failed mid-run. Steps before it stay applied and the revision
    /// store points at `last_applied`.
    #[error(
        "Migration {revision} failed: {source} (last applied: {})",
        .last_applied.as_deref().unwrap_or(BASE)
    )]
    StepFailed {
        revision: String,
        last_applied: Option<String>,
        completed: Vec<String>,
        source: Box<MigrationError>,
    },
}

/// Display name for the empty schema before the chain root.
pub const BASE: &str = "base";

pub(crate) fn revision_label(revision: Option<&str>) -> String {
    revision.unwrap_or(BASE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            MigrationError::UnknownRevision("abc".to_string()).to_string(),
            "Unknown revision: abc"
        );
        assert_eq!(
            MigrationError::DisconnectedChain {
                from: "a".to_string(),
                to: "x".to_string(),
            }
            .to_string(),
            "No path between revisions a and x"
        );
        assert_eq!(
            MigrationError::MultipleHeads(vec!["b".to_string(), "c".to_string()]).to_string(),
            "Multiple heads: b, c"
        );
        assert_eq!(
            MigrationError::UnsupportedOperation {
                backend: "sqlite".to_string(),
                detail: "alter column".to_string(),
            }
            .to_string(),
            "Unsupported operation on sqlite: alter column"
        );
    }

    #[test]
    fn step_failed_reports_last_applied() {
        let err = MigrationError::StepFailed {
            revision: "c".to_string(),
            last_applied: Some("b".to_string()),
            completed: vec!["b".to_string()],
            source: Box::new(MigrationError::SchemaConflict("boom".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Migration c failed: Schema conflict: boom (last applied: b)"
        );

        let err = MigrationError::StepFailed {
            revision: "a".to_string(),
            last_applied: None,
            completed: vec![],
            source: Box::new(MigrationError::Driver("down".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Migration a failed: Driver error: down (last applied: base)"
        );
    }

    #[test]
    fn step_failed_exposes_source() {
        use std::error::Error;

        let err = MigrationError::StepFailed {
            revision: "a".to_string(),
            last_applied: None,
            completed: vec![],
            source: Box::new(MigrationError::SchemaConflict("dup".to_string())),
        };
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Schema conflict: dup");
    }
}
