//! Migration system for Shoreline
//!
//! This module provides the infrastructure for tenant database migrations, including:
//! - Migration trait definition and the shared context handed to every unit
//! - Discovery of migration files and binding to registered units
//! - Per-database ledger tracking
//! - Sequential, fail-fast execution with best-effort rollback
//!
//! # Example
//!
//! ```rust,no_run
//! use shoreline::migration::{DocumentManager, Migration, MigrationContext, TargetDatabases};
//! use shoreline::StoreError;
//! use shoreline::bson::doc;
//!
//! pub struct AddDefaultPositions;
//!
//! impl Migration for AddDefaultPositions {
//!     fn name(&self) -> &str {
//!         "2022/202212181928_add_position.rs"
//!     }
//!
//!     fn description(&self) -> Option<&str> {
//!         Some("Add default positions")
//!     }
//!
//!     fn target_databases(&self) -> TargetDatabases {
//!         TargetDatabases::All
//!     }
//!
//!     fn execute(&self, db: &DocumentManager<'_>, context: &MigrationContext) -> Result<(), StoreError> {
//!         db.insert_one("position", doc! { "_id": context.uuid(), "name": "Bookkeeper" })
//!     }
//!
//!     fn rollback(&self, db: &DocumentManager<'_>, _context: &MigrationContext) -> Result<(), StoreError> {
//!         db.delete_one("position", doc! { "name": "Bookkeeper" }).map(|_| ())
//!     }
//! }
//! ```

pub mod context;
pub mod document_manager;
pub mod error;
pub mod file;
pub mod ledger;
#[allow(clippy::module_inception)]
pub mod migration;
pub mod migrator;
pub mod record;
pub mod registry;
pub mod startup;
pub mod status;
pub mod targets;

pub use context::{Clock, FixedClock, IdGenerator, MigrationContext, SequentialIds, SystemClock, UuidV4};
pub use document_manager::DocumentManager;
pub use error::{MigrationError, RollbackOutcome};
pub use file::MigrationFile;
pub use ledger::Ledger;
pub use migration::{Migration, TargetDatabases};
pub use migrator::Migrator;
pub use record::MigrationRecord;
pub use registry::{BoundMigration, MigrationRegistry};
pub use startup::{run_migrations, run_migrations_with, RunError};
pub use status::{DatabaseStatus, MigrationStatus, PendingMigration, RunSummary};
pub use targets::{is_reserved, list_allowed_databases, resolve_targets, SYSTEM_DATABASES};
