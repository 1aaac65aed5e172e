//! Migration-specific error types

use crate::executor::StoreError;
use std::fmt;
use std::path::PathBuf;

/// What happened when a failed unit was rolled back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// `rollback` returned successfully
    RolledBack,
    /// `rollback` itself failed; the message is kept for reporting only
    Failed(String),
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackOutcome::RolledBack => write!(f, "rollback succeeded"),
            RollbackOutcome::Failed(e) => write!(f, "rollback failed: {e}"),
        }
    }
}

/// Migration-specific errors
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Store error outside of a unit invocation (enumeration, ledger reads)
    #[error("Database error: {0}")]
    Database(#[from] StoreError),

    /// Migrations directory missing or unreadable
    #[error("Migration directory not readable: {path}: {message}")]
    Directory { path: PathBuf, message: String },

    /// Invalid migration file name
    #[error("Invalid migration format: {0}")]
    InvalidFormat(String),

    /// A discovered file has no registered unit bound to it
    #[error(
        "Migration file '{name}' has no registered unit.\n\
         Suggestion: register an implementation whose name() is '{name}'"
    )]
    Unregistered { name: String },

    /// Two units claim the same identity
    #[error("Migration '{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// The ledger lookup for a (unit, database) pair failed; nothing was executed for it
    #[error("Ledger lookup for '{name}' in database '{database}' failed: {source}")]
    Ledger {
        name: String,
        database: String,
        #[source]
        source: StoreError,
    },

    /// A unit failed for a database; the rollback attempt outcome is attached
    #[error(
        "Migration '{name}' failed for database '{database}': {source} ({rollback})"
    )]
    ExecutionFailed {
        name: String,
        database: String,
        #[source]
        source: StoreError,
        rollback: RollbackOutcome,
    },
}
