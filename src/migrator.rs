use std::fmt;
use std::str::FromStr;

use crate::error::{revision_label, MigrationError, Result, BASE};
use crate::executor::{SchemaCatalog, SchemaExecutor};
use crate::migration::{Direction, Migration, MigrationPath, RevisionChain};
use crate::state::RevisionStore;

/// Where a run should leave the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Base,
    Head,
    Revision(String),
}

impl Target {
    /// Accepts `"base"`, `"head"` or a revision token.
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim() {
            "" => Err(MigrationError::InvalidTarget(input.to_string())),
            BASE => Ok(Target::Base),
            "head" => Ok(Target::Head),
            revision => Ok(Target::Revision(revision.to_string())),
        }
    }
}

impl FromStr for Target {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        Target::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Base => f.write_str(BASE),
            Target::Head => f.write_str("head"),
            Target::Revision(revision) => f.write_str(revision),
        }
    }
}

/// Applies paths of the revision chain to one database and keeps its
/// revision store in step.
pub struct Migrator<'a, E, S> {
    chain: &'a RevisionChain,
    executor: E,
    store: S,
}

impl<'a, E: SchemaExecutor, S: RevisionStore> Migrator<'a, E, S> {
    pub fn new(chain: &'a RevisionChain, executor: E, store: S) -> Self {
        Self {
            chain,
            executor,
            store,
        }
    }

    pub fn chain(&self) -> &'a RevisionChain {
        self.chain
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_parts(self) -> (E, S) {
        (self.executor, self.store)
    }

    pub fn current(&mut self) -> Result<Option<String>> {
        self.store.current()
    }

    fn resolve_target(&self, target: &Target) -> Result<Option<&'static str>> {
        match target {
            Target::Base => Ok(None),
            Target::Head => self.chain.head(),
            Target::Revision(revision) => self
                .chain
                .get(revision)
                .map(|m| Some(m.revision))
                .ok_or_else(|| MigrationError::UnknownRevision(revision.clone())),
        }
    }

    /// Path from the stored revision to `target`.
    pub fn plan(&mut self, target: &Target) -> Result<MigrationPath<'a>> {
        let current = self.store.current()?;
        let to = self.resolve_target(target)?;
        self.chain.resolve_path(current.as_deref(), to)
    }

    pub fn migrate_to(&mut self, target: &Target) -> Result<Vec<String>> {
        let path = self.plan(target)?;
        self.apply(&path)
    }

    pub fn upgrade(&mut self) -> Result<Vec<String>> {
        self.migrate_to(&Target::Head)
    }

    /// Revert down to `target`. A target above the stored revision is
    /// rejected rather than upgraded to.
    pub fn downgrade(&mut self, target: &Target) -> Result<Vec<String>> {
        let path = self.plan(target)?;
        if path.direction == Direction::Upgrade && !path.is_empty() {
            return Err(MigrationError::InvalidTarget(format!(
                "{} is not below the current revision",
                target
            )));
        }
        self.apply(&path)
    }

    /// Revisions between the stored revision and the head, oldest first.
    pub fn pending(&mut self) -> Result<Vec<&'static str>> {
        let path = self.plan(&Target::Head)?;
        match path.direction {
            Direction::Upgrade => Ok(path.revisions()),
            Direction::Downgrade => Ok(Vec::new()),
        }
    }

    pub fn history(&self) -> Result<Vec<&'a Migration>> {
        self.chain.history()
    }

    /// Run `path` step by step. The path must start at the stored revision.
    ///
    /// A failing step stops the run. Earlier steps stay applied and the store
    /// keeps pointing at the last one that succeeded.
    pub fn apply(&mut self, path: &MigrationPath<'_>) -> Result<Vec<String>> {
        check_reversible(path)?;

        let mut last_applied = self.store.current()?;
        if let Some(first) = path.steps.first() {
            let starts_at = match path.direction {
                Direction::Upgrade => first.parent,
                Direction::Downgrade => Some(first.revision),
            };
            if starts_at != last_applied.as_deref() {
                return Err(MigrationError::InvalidTarget(format!(
                    "path starts at {} but the current revision is {}",
                    revision_label(starts_at),
                    revision_label(last_applied.as_deref())
                )));
            }
        }

        let mut completed = Vec::new();

        for step in &path.steps {
            let next = match path.direction {
                Direction::Upgrade => Some(step.revision),
                Direction::Downgrade => step.parent,
            };

            tracing::info!(
                revision = step.revision,
                direction = %path.direction,
                target = %revision_label(next),
                "running migration"
            );

            if let Err(source) = self.run_step(step, path.direction, next) {
                tracing::warn!(
                    revision = step.revision,
                    direction = %path.direction,
                    error = %source,
                    "migration failed"
                );
                return Err(MigrationError::StepFailed {
                    revision: step.revision.to_string(),
                    last_applied,
                    completed,
                    source: Box::new(source),
                });
            }

            completed.push(step.revision.to_string());
            last_applied = next.map(str::to_string);
        }

        Ok(completed)
    }

    fn run_step(
        &mut self,
        step: &Migration,
        direction: Direction,
        next: Option<&str>,
    ) -> Result<()> {
        let transactional =
            step.is_atomic() && self.executor.backend().supports_transactional_ddl();

        if transactional {
            self.executor.begin()?;
        }

        let result = match direction {
            Direction::Upgrade => step.upgrade(&mut self.executor),
            Direction::Downgrade => step.downgrade(&mut self.executor),
        }
        .and_then(|()| self.store.set_current(next));

        match result {
            Ok(()) if transactional => self.executor.commit(),
            Ok(()) => Ok(()),
            Err(err) => {
                if transactional {
                    if let Err(rollback) = self.executor.rollback() {
                        tracing::warn!(
                            revision = step.revision,
                            error = %rollback,
                            "rollback failed"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    /// Render the SQL script for reaching `target` without touching the
    /// database. Steps run against `catalog`, which must describe the schema
    /// at the stored revision.
    pub fn generate_sql(
        &mut self,
        target: &Target,
        catalog: &mut SchemaCatalog<'_>,
    ) -> Result<Vec<String>> {
        let path = self.plan(target)?;
        check_reversible(&path)?;

        let mut script = Vec::new();
        for step in &path.steps {
            let next = match path.direction {
                Direction::Upgrade => Some(step.revision),
                Direction::Downgrade => step.parent,
            };
            let (from, to) = match path.direction {
                Direction::Upgrade => (step.parent, next),
                Direction::Downgrade => (Some(step.revision), next),
            };

            script.push(format!(
                "-- Running {} {} -> {}",
                path.direction,
                revision_label(from),
                revision_label(to)
            ));

            match path.direction {
                Direction::Upgrade => step.upgrade(catalog)?,
                Direction::Downgrade => step.downgrade(catalog)?,
            }
            script.extend(catalog.take_statements());
        }

        Ok(script)
    }
}

fn check_reversible(path: &MigrationPath<'_>) -> Result<()> {
    if path.direction == Direction::Downgrade {
        if let Some(step) = path.steps.iter().find(|m| !m.is_reversible()) {
            return Err(MigrationError::NotReversible(step.revision.to_string()));
        }
    }
    Ok(())
}
