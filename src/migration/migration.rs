//! Migration trait definition

use super::context::MigrationContext;
use super::document_manager::DocumentManager;
use crate::executor::StoreError;

/// Databases a unit wants to run against
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetDatabases {
    /// Every non-reserved database in the cluster
    #[default]
    All,
    /// Only these databases, in this order; names outside the allowed set are ignored
    Only(Vec<String>),
}

impl TargetDatabases {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TargetDatabases::Only(names.into_iter().map(Into::into).collect())
    }
}

/// Trait that all migration units must implement
///
/// A unit is bound to exactly one file under the migrations root: `name()` is
/// that file's path relative to the root, with `/` separators
/// (e.g. `2022/202212181928_add_position.rs`). The name is also the key written
/// to the ledger, so it must never change once the unit has shipped.
pub trait Migration: Send + Sync {
    /// Identity of the unit: its discovery path relative to the migrations root
    fn name(&self) -> &str;

    /// Stored verbatim in ledger records
    fn description(&self) -> Option<&str> {
        None
    }

    fn target_databases(&self) -> TargetDatabases {
        TargetDatabases::All
    }

    /// Apply the unit to one database
    ///
    /// May run again after a crash between a successful `execute` and the ledger
    /// write, so effects must be safe to repeat.
    fn execute(&self, db: &DocumentManager<'_>, context: &MigrationContext) -> Result<(), StoreError>;

    /// Undo the external effects of a failed `execute` on one database
    ///
    /// Best-effort: its outcome is reported but never changes the run's result.
    fn rollback(&self, db: &DocumentManager<'_>, context: &MigrationContext) -> Result<(), StoreError>;
}
