//! Migration status tracking

use crate::migration::MigrationRecord;
use serde::Serialize;

/// A (unit, database) pair that has not been applied yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMigration {
    /// Unit identity
    pub name: String,

    /// Target database
    pub database: String,
}

/// Migration status of one target database
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStatus {
    pub database: String,

    /// Records found in this database's ledger, oldest first
    pub applied: Vec<MigrationRecord>,

    /// Discovered units targeting this database with no ledger record, in run order
    pub pending: Vec<String>,
}

impl DatabaseStatus {
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Migration status information across the cluster
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    /// One entry per non-reserved database
    pub databases: Vec<DatabaseStatus>,

    /// Number of discovered migration files
    pub discovered: usize,
}

impl MigrationStatus {
    /// Create a new `MigrationStatus`
    #[must_use]
    pub fn new(databases: Vec<DatabaseStatus>, discovered: usize) -> Self {
        Self {
            databases,
            discovered,
        }
    }

    /// Check if every database has every targeting unit applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.databases.iter().all(DatabaseStatus::is_up_to_date)
    }

    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.databases.iter().map(|d| d.applied.len()).sum()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.databases.iter().map(|d| d.pending.len()).sum()
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseStatus> {
        self.databases.iter().find(|d| d.database == name)
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Discovered (and bound) migration files
    pub files: usize,

    /// (unit, database) pairs executed and recorded during this run
    pub applied: usize,

    /// (unit, database) pairs skipped because the ledger already had them
    pub skipped: usize,
}
