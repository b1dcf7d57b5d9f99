mod batch;
mod column;
mod table;

pub use batch::BatchAlterTable;
pub use column::{AddColumn, AlterColumn, DropColumn, RenameColumn};
pub use table::{CreateTable, DropTable};

use crate::change::SchemaChange;

/// One authored schema operation inside a migration step.
pub trait Operation: Send + Sync {
    fn forward(&self) -> Vec<SchemaChange>;

    /// Changes that undo [`Operation::forward`], or `None` when the
    /// operation does not carry enough information to be reverted.
    fn backward(&self) -> Option<Vec<SchemaChange>>;

    fn describe(&self) -> String;

    fn is_reversible(&self) -> bool {
        true
    }
}
