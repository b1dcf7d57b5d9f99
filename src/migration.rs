use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::change::SchemaChange;
use crate::error::{revision_label, MigrationError, Result};
use crate::executor::SchemaExecutor;
use crate::operation::Operation;

/// One step of the revision chain.
pub struct Migration {
    pub revision: &'static str,
    /// `None` marks the root of the chain.
    pub parent: Option<&'static str>,
    pub message: &'static str,
    forward: Vec<Box<dyn Operation>>,
    backward: Option<Vec<Box<dyn Operation>>>,
    atomic: bool,
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("revision", &self.revision)
            .field("parent", &self.parent)
            .field("message", &self.message)
            .field("forward", &format!("[{} operations]", self.forward.len()))
            .field(
                "backward",
                &self
                    .backward
                    .as_ref()
                    .map(|b| format!("[{} operations]", b.len())),
            )
            .field("atomic", &self.atomic)
            .finish()
    }
}

impl Migration {
    pub fn new(revision: &'static str) -> Self {
        Self {
            revision,
            parent: None,
            message: "",
            forward: Vec::new(),
            backward: None,
            atomic: true,
        }
    }

    pub fn parent(mut self, parent: &'static str) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn message(mut self, message: &'static str) -> Self {
        self.message = message;
        self
    }

    /// Set whether this step runs inside a transaction on engines with
    /// transactional DDL. Defaults to `true`.
    pub fn atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Add an operation whose inverse is derived automatically.
    pub fn operation(mut self, op: impl Operation + 'static) -> Self {
        self.forward.push(Box::new(op));
        self
    }

    /// Replace the upgrade operations.
    pub fn forward_ops(mut self, ops: Vec<Box<dyn Operation>>) -> Self {
        self.forward = ops;
        self
    }

    /// Set explicit downgrade operations. They run in the given order,
    /// replacing the derived inverse.
    pub fn backward_ops(mut self, ops: Vec<Box<dyn Operation>>) -> Self {
        self.backward = Some(ops);
        self
    }

    pub fn is_reversible(&self) -> bool {
        self.backward.is_some() || self.forward.iter().all(|op| op.is_reversible())
    }

    pub fn forward_operations(&self) -> &[Box<dyn Operation>] {
        &self.forward
    }

    pub fn backward_operations(&self) -> Option<&[Box<dyn Operation>]> {
        self.backward.as_deref()
    }

    pub fn upgrade_changes(&self) -> Vec<SchemaChange> {
        self.forward.iter().flat_map(|op| op.forward()).collect()
    }

    pub fn downgrade_changes(&self) -> Result<Vec<SchemaChange>> {
        if let Some(ref backward) = self.backward {
            return Ok(backward.iter().flat_map(|op| op.forward()).collect());
        }

        let mut changes = Vec::new();
        for op in self.forward.iter().rev() {
            let undo = op.backward().ok_or_else(|| {
                MigrationError::NotReversible(format!("{} ({})", self.revision, op.describe()))
            })?;
            changes.extend(undo);
        }
        Ok(changes)
    }

    pub fn upgrade<E: SchemaExecutor + ?Sized>(&self, executor: &mut E) -> Result<()> {
        for change in self.upgrade_changes() {
            executor.apply(&change)?;
        }
        Ok(())
    }

    pub fn downgrade<E: SchemaExecutor + ?Sized>(&self, executor: &mut E) -> Result<()> {
        for change in self.downgrade_changes()? {
            executor.apply(&change)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upgrade,
    Downgrade,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upgrade => f.write_str("upgrade"),
            Direction::Downgrade => f.write_str("downgrade"),
        }
    }
}

/// Ordered steps between two revisions. Upgrade paths run oldest first,
/// downgrade paths newest first.
#[derive(Debug, Clone)]
pub struct MigrationPath<'a> {
    pub direction: Direction,
    pub steps: Vec<&'a Migration>,
}

impl<'a> MigrationPath<'a> {
    fn empty() -> Self {
        Self {
            direction: Direction::Upgrade,
            steps: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn revisions(&self) -> Vec<&'static str> {
        self.steps.iter().map(|m| m.revision).collect()
    }
}

/// Linear revision history stored as a flat arena with a token index.
#[derive(Debug, Default)]
pub struct RevisionChain {
    steps: Vec<Migration>,
    index: HashMap<&'static str, usize>,
}

impl RevisionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, migration: Migration) -> Result<()> {
        if self.index.contains_key(migration.revision) {
            return Err(MigrationError::DuplicateRevision(
                migration.revision.to_string(),
            ));
        }
        self.index.insert(migration.revision, self.steps.len());
        self.steps.push(migration);
        Ok(())
    }

    pub fn get(&self, revision: &str) -> Option<&Migration> {
        self.index.get(revision).map(|&pos| &self.steps[pos])
    }

    /// Steps in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Migration> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Revisions no other step names as its parent.
    pub fn heads(&self) -> Vec<&'static str> {
        let parents: HashSet<&str> = self.steps.iter().filter_map(|m| m.parent).collect();
        self.steps
            .iter()
            .map(|m| m.revision)
            .filter(|rev| !parents.contains(rev))
            .collect()
    }

    /// The single tip of the chain, or `None` for an empty chain.
    pub fn head(&self) -> Result<Option<&'static str>> {
        let Some(first) = self.steps.first() else {
            return Ok(None);
        };

        match self.heads().as_slice() {
            [] => Err(MigrationError::CircularChain(first.revision.to_string())),
            [head] => Ok(Some(*head)),
            many => Err(MigrationError::MultipleHeads(
                many.iter().map(|rev| rev.to_string()).collect(),
            )),
        }
    }

    /// Arena positions from `revision` back to the root, newest first.
    fn ancestry(&self, revision: &str) -> Result<Vec<usize>> {
        let mut line = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(revision);

        while let Some(rev) = cursor {
            let pos = *self
                .index
                .get(rev)
                .ok_or_else(|| MigrationError::UnknownRevision(rev.to_string()))?;
            if !seen.insert(pos) {
                return Err(MigrationError::CircularChain(rev.to_string()));
            }
            line.push(pos);
            cursor = self.steps[pos].parent;
        }

        Ok(line)
    }

    /// Steps from the root to the head, oldest first.
    pub fn history(&self) -> Result<Vec<&Migration>> {
        let Some(head) = self.head()? else {
            return Ok(Vec::new());
        };
        Ok(self
            .ancestry(head)?
            .into_iter()
            .rev()
            .map(|pos| &self.steps[pos])
            .collect())
    }

    /// Steps that take the schema from `from` to `to`. `None` is base.
    ///
    /// `from` is the applied revision and is never part of the path. An
    /// upgrade includes `to`; a downgrade stops just above it.
    pub fn resolve_path(&self, from: Option<&str>, to: Option<&str>) -> Result<MigrationPath<'_>> {
        let to_line = match to {
            Some(rev) => self.ancestry(rev)?,
            None => Vec::new(),
        };
        let from_line = match from {
            Some(rev) => self.ancestry(rev)?,
            None => Vec::new(),
        };

        if from == to {
            return Ok(MigrationPath::empty());
        }

        let from_pos = from.and_then(|rev| self.index.get(rev).copied());
        let to_pos = to.and_then(|rev| self.index.get(rev).copied());

        if let Some(cut) = split_at(&to_line, from_pos) {
            return Ok(MigrationPath {
                direction: Direction::Upgrade,
                steps: to_line[..cut]
                    .iter()
                    .rev()
                    .map(|&pos| &self.steps[pos])
                    .collect(),
            });
        }

        if let Some(cut) = split_at(&from_line, to_pos) {
            return Ok(MigrationPath {
                direction: Direction::Downgrade,
                steps: from_line[..cut].iter().map(|&pos| &self.steps[pos]).collect(),
            });
        }

        Err(MigrationError::DisconnectedChain {
            from: revision_label(from),
            to: revision_label(to),
        })
    }
}

/// Where `line` (newest first) reaches `ancestor`; base is past the root.
fn split_at(line: &[usize], ancestor: Option<usize>) -> Option<usize> {
    match ancestor {
        Some(pos) => line.iter().position(|&p| p == pos),
        None => Some(line.len()),
    }
}
