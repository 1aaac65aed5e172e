//! Migrator - Core migration execution engine

use crate::config::{DiscoveryConfig, MigrateConfig};
use crate::executor::DocumentExecutor;
use crate::migration::file::discover_migrations;
use crate::migration::ledger::Ledger;
use crate::migration::registry::BoundMigration;
use crate::migration::targets::{list_allowed_databases, resolve_targets};
use crate::migration::{
    DatabaseStatus, DocumentManager, MigrationContext, MigrationError, MigrationFile,
    MigrationRecord, MigrationRegistry, MigrationStatus, PendingMigration, RollbackOutcome,
    RunSummary,
};
use std::path::{Path, PathBuf};

/// Core migration execution engine
///
/// The `Migrator` orchestrates discovery, target resolution, ledger checks,
/// unit execution and recording. Processing is strictly sequential: units in
/// discovery order, and for each unit its target databases one after another.
/// The first failure stops the run and is returned to the caller.
#[derive(Debug, Clone)]
pub struct Migrator {
    migrations_dir: PathBuf,
    extensions: Vec<String>,
    ledger_db: String,
}

impl Migrator {
    /// Create a new Migrator for `migrations_dir` using `ledger_db` as the ledger name
    pub fn new(migrations_dir: impl AsRef<Path>, ledger_db: impl Into<String>) -> Self {
        Self {
            migrations_dir: migrations_dir.as_ref().to_path_buf(),
            extensions: vec!["rs".to_string()],
            ledger_db: ledger_db.into(),
        }
    }

    pub fn from_config(config: &MigrateConfig) -> Self {
        Self::from_discovery(&DiscoveryConfig::from(config))
    }

    /// Migrator for read-only commands that never connect to the cluster
    pub fn from_discovery(discovery: &DiscoveryConfig) -> Self {
        Self::new(&discovery.migrations_dir, discovery.ledger_db.clone())
            .with_extensions(discovery.extensions.clone())
    }

    /// Replace the accepted file extensions
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    pub fn ledger_db(&self) -> &str {
        &self.ledger_db
    }

    /// Discover all migration files in processing order
    pub fn discover_migrations(&self) -> Result<Vec<MigrationFile>, MigrationError> {
        discover_migrations(&self.migrations_dir, &self.extensions)
    }

    fn plan<'r>(&self, registry: &'r MigrationRegistry) -> Result<Vec<BoundMigration<'r>>, MigrationError> {
        registry.bind(self.discover_migrations()?)
    }

    /// Apply every pending (unit, database) pair
    ///
    /// For each discovered unit, in order, and each of its resolved target
    /// databases: skip if the ledger has a record, otherwise `execute`, then
    /// record. If either step fails, `rollback` is attempted once for that pair
    /// and the run stops with `MigrationError::ExecutionFailed`; no further
    /// database or unit is processed.
    ///
    /// # Returns
    ///
    /// Returns a `RunSummary` of what was applied and skipped.
    pub fn up(
        &self,
        executor: &dyn DocumentExecutor,
        registry: &MigrationRegistry,
        context: &MigrationContext,
    ) -> Result<RunSummary, MigrationError> {
        let plan = self.plan(registry)?;
        let allowed = list_allowed_databases(executor, &self.ledger_db)?;
        let ledger = Ledger::new(&self.ledger_db);

        let mut summary = RunSummary {
            files: plan.len(),
            ..RunSummary::default()
        };

        for bound in &plan {
            let name = bound.name();
            log::info!("Current file: {}", bound.file.path.display());

            let targets = resolve_targets(&allowed, &bound.unit.target_databases());
            for database in &targets {
                let applied = ledger
                    .is_applied(executor, database, name)
                    .map_err(|source| MigrationError::Ledger {
                        name: name.to_string(),
                        database: database.clone(),
                        source,
                    })?;

                if applied {
                    log::debug!("Migration {name} already applied for db {database}, skipping");
                    summary.skipped += 1;
                    continue;
                }

                log::info!("Migration {name} didn't run yet for db {database}, executing...");
                Self::apply(executor, &ledger, bound, database, context)?;
                log::info!("Migration {name} for db {database} ran successfully!");
                summary.applied += 1;
            }
        }

        log::info!(
            "Done! {} file(s), {} applied, {} skipped",
            summary.files,
            summary.applied,
            summary.skipped
        );
        Ok(summary)
    }

    /// Execute one unit against one database and record it
    fn apply(
        executor: &dyn DocumentExecutor,
        ledger: &Ledger<'_>,
        bound: &BoundMigration<'_>,
        database: &str,
        context: &MigrationContext,
    ) -> Result<(), MigrationError> {
        let name = bound.name();
        let manager = DocumentManager::new(executor, database);

        let result = bound.unit.execute(&manager, context).and_then(|()| {
            let record = MigrationRecord::new(
                name.to_string(),
                context.timestamp(),
                bound.unit.description().map(str::to_string),
            );
            ledger.record(executor, database, &record)
        });

        let source = match result {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        log::error!(
            "an error occurred while proceeding {name} for db {database}. Error: {source}, try to rollback..."
        );
        let rollback = match bound.unit.rollback(&manager, context) {
            Ok(()) => {
                log::warn!("rolled back {name} for db {database}");
                RollbackOutcome::RolledBack
            }
            Err(e) => {
                log::error!("could not rollback {name} & db {database}: {e}");
                RollbackOutcome::Failed(e.to_string())
            }
        };

        Err(MigrationError::ExecutionFailed {
            name: name.to_string(),
            database: database.to_string(),
            source,
            rollback,
        })
    }

    /// List the (unit, database) pairs the next `up` would execute, in order
    ///
    /// Read-only: performs ledger lookups but never executes or writes.
    pub fn pending(
        &self,
        executor: &dyn DocumentExecutor,
        registry: &MigrationRegistry,
    ) -> Result<Vec<PendingMigration>, MigrationError> {
        let plan = self.plan(registry)?;
        let allowed = list_allowed_databases(executor, &self.ledger_db)?;
        let ledger = Ledger::new(&self.ledger_db);

        let mut pending = Vec::new();
        for bound in &plan {
            for database in resolve_targets(&allowed, &bound.unit.target_databases()) {
                let applied = ledger
                    .is_applied(executor, &database, bound.name())
                    .map_err(|source| MigrationError::Ledger {
                        name: bound.name().to_string(),
                        database: database.clone(),
                        source,
                    })?;
                if !applied {
                    pending.push(PendingMigration {
                        name: bound.name().to_string(),
                        database,
                    });
                }
            }
        }
        Ok(pending)
    }

    /// Get migration status (applied vs pending) for every non-reserved database
    pub fn status(
        &self,
        executor: &dyn DocumentExecutor,
        registry: &MigrationRegistry,
    ) -> Result<MigrationStatus, MigrationError> {
        let plan = self.plan(registry)?;
        let allowed = list_allowed_databases(executor, &self.ledger_db)?;
        let ledger = Ledger::new(&self.ledger_db);

        let mut databases = Vec::with_capacity(allowed.len());
        for database in &allowed {
            let applied = ledger.applied(executor, database)?;
            let pending = plan
                .iter()
                .filter(|bound| {
                    resolve_targets(&allowed, &bound.unit.target_databases()).contains(database)
                })
                .filter(|bound| !applied.iter().any(|record| record.name == bound.name()))
                .map(|bound| bound.name().to_string())
                .collect();

            databases.push(DatabaseStatus {
                database: database.clone(),
                applied,
                pending,
            });
        }

        Ok(MigrationStatus::new(databases, plan.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StoreError;
    use crate::migration::{Migration, TargetDatabases};
    use crate::testing::MemoryExecutor;
    use mongodb::bson::doc;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Calls {
        execute: AtomicUsize,
        rollback: AtomicUsize,
    }

    struct Probe {
        name: String,
        targets: TargetDatabases,
        fail_on: Option<String>,
        calls: Arc<Calls>,
    }

    impl Migration for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> Option<&str> {
            Some("probe")
        }

        fn target_databases(&self) -> TargetDatabases {
            self.targets.clone()
        }

        fn execute(&self, db: &DocumentManager<'_>, _context: &MigrationContext) -> Result<(), StoreError> {
            self.calls.execute.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.as_deref() == Some(db.database_name()) {
                return Err(StoreError::Other("probe failure".to_string()));
            }
            db.insert_one("probe", doc! { "unit": self.name.as_str() })?;
            Ok(())
        }

        fn rollback(&self, _db: &DocumentManager<'_>, _context: &MigrationContext) -> Result<(), StoreError> {
            self.calls.rollback.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn probe(name: &str, targets: TargetDatabases, fail_on: Option<&str>) -> (Box<dyn Migration>, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let unit = Probe {
            name: name.to_string(),
            targets,
            fail_on: fail_on.map(str::to_string),
            calls: Arc::clone(&calls),
        };
        (Box::new(unit), calls)
    }

    fn migrations_dir(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for file in files {
            fs::write(dir.path().join(file), "// unit\n").expect("write");
        }
        dir
    }

    #[test]
    fn test_up_applies_then_skips() {
        let dir = migrations_dir(&["001_a.rs"]);
        let (unit, calls) = probe("001_a.rs", TargetDatabases::All, None);
        let registry = MigrationRegistry::new().with(unit).expect("registry");
        let cluster = MemoryExecutor::with_databases(["admin", "acme", "orgdb"]);
        let migrator = Migrator::new(dir.path(), "_migration");
        let context = MigrationContext::new();

        let first = migrator.up(&cluster, &registry, &context).expect("first run");
        assert_eq!(first, RunSummary { files: 1, applied: 2, skipped: 0 });

        let second = migrator.up(&cluster, &registry, &context).expect("second run");
        assert_eq!(second, RunSummary { files: 1, applied: 0, skipped: 2 });
        assert_eq!(calls.execute.load(Ordering::SeqCst), 2);
        assert!(cluster.writes_to("admin").is_empty());
    }

    #[test]
    fn test_record_failure_triggers_rollback() {
        let dir = migrations_dir(&["001_a.rs"]);
        let (unit, calls) = probe("001_a.rs", TargetDatabases::All, None);
        let registry = MigrationRegistry::new().with(unit).expect("registry");
        let cluster = MemoryExecutor::with_databases(["orgdb"]);
        cluster.fail_writes_to("orgdb", "_migration");

        let err = Migrator::new(dir.path(), "_migration")
            .up(&cluster, &registry, &MigrationContext::new())
            .expect_err("ledger write failure must abort");

        assert!(matches!(err, MigrationError::ExecutionFailed { rollback: RollbackOutcome::RolledBack, .. }));
        assert_eq!(calls.rollback.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pending_and_status_are_read_only() {
        let dir = migrations_dir(&["001_a.rs", "002_b.rs"]);
        let (a, _) = probe("001_a.rs", TargetDatabases::All, None);
        let (b, b_calls) = probe("002_b.rs", TargetDatabases::only(["orgdb"]), None);
        let registry = MigrationRegistry::new().with(a).and_then(|r| r.with(b)).expect("registry");
        let cluster = MemoryExecutor::with_databases(["acme", "orgdb"]);
        let migrator = Migrator::new(dir.path(), "_migration");

        let pending = migrator.pending(&cluster, &registry).expect("pending");
        let pairs: Vec<_> = pending.iter().map(|p| (p.name.as_str(), p.database.as_str())).collect();
        assert_eq!(pairs, vec![("001_a.rs", "acme"), ("001_a.rs", "orgdb"), ("002_b.rs", "orgdb")]);

        let status = migrator.status(&cluster, &registry).expect("status");
        assert_eq!(status.discovered, 2);
        assert_eq!(status.pending_count(), 3);
        assert_eq!(status.database("acme").map(|d| d.pending.clone()), Some(vec!["001_a.rs".to_string()]));

        assert!(cluster.writes().is_empty());
        assert_eq!(b_calls.execute.load(Ordering::SeqCst), 0);

        migrator.up(&cluster, &registry, &MigrationContext::new()).expect("run");
        let status = migrator.status(&cluster, &registry).expect("status");
        assert!(status.is_up_to_date());
        assert_eq!(status.applied_count(), 3);
        assert!(migrator.pending(&cluster, &registry).expect("pending").is_empty());
    }

    #[test]
    fn test_discovery_migrator_sees_the_files_a_run_processes() {
        let dir = migrations_dir(&["001_a.js", "002_b.rs", "003_c.js"]);
        let mut vars = ::config::Map::new();
        for (key, value) in [
            ("MONGO_HOST", "mongo"),
            ("MONGO_PORT", "27017"),
            ("MONGO_USERNAME", "root"),
            ("MONGO_PASSWORD", "secret"),
            ("MIGRATIONS_EXTENSIONS", "js"),
        ] {
            vars.insert(key.to_string(), value.to_string());
        }
        vars.insert(
            "MIGRATIONS_DIR".to_string(),
            dir.path().to_string_lossy().into_owned(),
        );

        let run = MigrateConfig::from_env_map(vars.clone()).expect("config");
        let mut credentials_free = vars;
        credentials_free.retain(|key, _| !key.starts_with("MONGO_"));
        let discovery = DiscoveryConfig::from_env_map(credentials_free).expect("discovery");

        let for_run = Migrator::from_config(&run).discover_migrations().expect("discover");
        let for_list = Migrator::from_discovery(&discovery).discover_migrations().expect("discover");
        let names: Vec<_> = for_list.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["001_a.js", "003_c.js"]);
        assert_eq!(for_list, for_run);
    }

    #[test]
    fn test_unregistered_file_aborts_before_any_write() {
        let dir = migrations_dir(&["001_a.rs", "002_stray.rs"]);
        let (unit, calls) = probe("001_a.rs", TargetDatabases::All, None);
        let registry = MigrationRegistry::new().with(unit).expect("registry");
        let cluster = MemoryExecutor::with_databases(["orgdb"]);

        let err = Migrator::new(dir.path(), "_migration")
            .up(&cluster, &registry, &MigrationContext::new())
            .expect_err("stray file must abort");
        assert!(matches!(err, MigrationError::Unregistered { .. }));
        assert_eq!(calls.execute.load(Ordering::SeqCst), 0);
        assert!(cluster.writes().is_empty());
    }
}
