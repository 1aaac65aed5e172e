//! Tests for the built-in registry and migration scaffolding

use chrono::{TimeZone, Utc};
use shoreline::migration::{
    FixedClock, MigrationContext, MigrationError, Migrator, SequentialIds,
};
use shoreline::testing::MemoryExecutor;
use shoreline_migrate::builtin_registry;
use shoreline_migrate::generate::{generate_migration, migration_filename, struct_name};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn repo_migrations() -> Migrator {
    Migrator::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../migrations"), "_migration")
}

fn fixed_context() -> MigrationContext {
    let instant = Utc.with_ymd_and_hms(2022, 12, 18, 19, 28, 0).unwrap();
    MigrationContext::with_helpers(Arc::new(FixedClock(instant)), Arc::new(SequentialIds::new("id")))
}

#[test]
fn test_builtin_registry_matches_migration_files() {
    let registry = builtin_registry().unwrap();
    let files = repo_migrations().discover_migrations().unwrap();

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["examples/202201010000_hello.rs", "2022/202212181928_add_position.rs"]
    );
    assert_eq!(registry.len(), files.len());
    assert_eq!(registry.bind(files).unwrap().len(), 2);
}

#[test]
fn test_builtin_units_apply_once_per_tenant() {
    let registry = builtin_registry().unwrap();
    let cluster = MemoryExecutor::with_databases(["admin", "local", "_migration", "orgdb", "acme"]);
    let migrator = repo_migrations();
    let context = fixed_context();

    let summary = migrator.up(&cluster, &registry, &context).unwrap();
    assert_eq!(summary.files, 2);
    assert_eq!(summary.applied, 4);
    assert_eq!(summary.skipped, 0);

    for tenant in ["orgdb", "acme"] {
        let positions = cluster.documents(tenant, "position");
        assert_eq!(positions.len(), 15);
        assert_eq!(
            positions[0].get_str("creationDate").unwrap(),
            "2022-12-18T19:28:00.000"
        );
        assert_eq!(cluster.documents(tenant, "myCollection").len(), 1);
        assert_eq!(cluster.documents(tenant, "_migration").len(), 2);
    }
    assert!(cluster.writes_to("admin").is_empty());
    assert!(cluster.writes_to("_migration").is_empty());

    let writes_before = cluster.writes().len();
    let second = migrator.up(&cluster, &registry, &context).unwrap();
    assert_eq!(second.applied, 0);
    assert_eq!(second.skipped, 4);
    assert_eq!(cluster.writes().len(), writes_before);
}

#[test]
fn test_migration_filename() {
    let now = Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap();
    assert_eq!(
        migration_filename(now, "add_default_positions").unwrap(),
        "20240120120000_add_default_positions.rs"
    );
    assert!(matches!(
        migration_filename(now, "Add Positions"),
        Err(MigrationError::InvalidFormat(_))
    ));
    assert!(migration_filename(now, "").is_err());
}

#[test]
fn test_struct_name() {
    assert_eq!(struct_name("add_default_positions"), "AddDefaultPositions");
    assert_eq!(struct_name("hello"), "Hello");
    assert_eq!(struct_name("v2__split"), "V2Split");
}

#[test]
fn test_generate_writes_discoverable_file() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("migrations");
    let now = Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap();

    let path = generate_migration(&dir, "add_default_positions", now).unwrap();
    assert_eq!(path, dir.join("20240120120000_add_default_positions.rs"));

    let source = fs::read_to_string(&path).unwrap();
    assert!(source.contains("pub struct AddDefaultPositions;"));
    assert!(source.contains("\"20240120120000_add_default_positions.rs\""));
    assert!(source.contains("impl Migration for AddDefaultPositions"));
    assert!(source.contains("_db: &DocumentManager<'_>, _context: &MigrationContext"));
    assert!(!source.contains("let _ ="));
    assert!(!source.contains("\nuse shoreline::bson"));

    let files = Migrator::new(&dir, "_migration").discover_migrations().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "20240120120000_add_default_positions.rs");
    assert_eq!(files[0].order, 20240120120000);
}

#[test]
fn test_generate_refuses_to_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap();

    generate_migration(temp_dir.path(), "seed", now).unwrap();
    let result = generate_migration(temp_dir.path(), "seed", now);
    assert!(matches!(result, Err(MigrationError::Directory { .. })));
}
