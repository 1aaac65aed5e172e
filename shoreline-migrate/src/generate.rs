//! Scaffolding for new migration units

use chrono::{DateTime, Utc};
use regex::Regex;
use shoreline::migration::MigrationError;
use std::fs;
use std::path::{Path, PathBuf};

/// Validate a unit name and build its file name: `{YYYYMMDDHHMMSS}_{name}.rs`
pub fn migration_filename(now: DateTime<Utc>, name: &str) -> Result<String, MigrationError> {
    let re = Regex::new(r"^[a-z][a-z0-9_]*$")
        .map_err(|e| MigrationError::InvalidFormat(format!("Invalid regex: {e}")))?;
    if !re.is_match(name) {
        return Err(MigrationError::InvalidFormat(format!(
            "Migration name '{name}' must be snake_case (e.g. add_default_positions)"
        )));
    }
    Ok(format!("{}_{}.rs", now.format("%Y%m%d%H%M%S"), name))
}

/// `add_default_positions` → `AddDefaultPositions`
pub fn struct_name(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Source of a new unit whose identity is `identity`
pub fn render_template(identity: &str, name: &str, now: DateTime<Utc>) -> String {
    format!(
        r#"//! Migration: {name}
//! Identity: {identity}
//! Generated: {generated}

use shoreline::migration::{{DocumentManager, Migration, MigrationContext, TargetDatabases}};
use shoreline::StoreError;

pub struct {struct_name};

impl Migration for {struct_name} {{
    fn name(&self) -> &str {{
        "{identity}"
    }}

    fn description(&self) -> Option<&str> {{
        None
    }}

    fn target_databases(&self) -> TargetDatabases {{
        TargetDatabases::All
    }}

    fn execute(&self, _db: &DocumentManager<'_>, _context: &MigrationContext) -> Result<(), StoreError> {{
        // Example (with `use shoreline::bson::doc;`):
        // db.insert_one("example", doc! {{ "_id": context.uuid(), "createdAt": context.now() }})?;
        Ok(())
    }}

    fn rollback(&self, _db: &DocumentManager<'_>, _context: &MigrationContext) -> Result<(), StoreError> {{
        // Example:
        // db.drop_collection("example")?;
        Ok(())
    }}
}}
"#,
        name = name,
        identity = identity,
        generated = now.format("%Y-%m-%d %H:%M:%S UTC"),
        struct_name = struct_name(name),
    )
}

/// Write a new unit file at the root of `migrations_dir`
///
/// # Errors
///
/// Returns `MigrationError::InvalidFormat` for a bad name and
/// `MigrationError::Directory` if the directory or file cannot be written or
/// the file already exists.
pub fn generate_migration(
    migrations_dir: &Path,
    name: &str,
    now: DateTime<Utc>,
) -> Result<PathBuf, MigrationError> {
    let filename = migration_filename(now, name)?;

    fs::create_dir_all(migrations_dir).map_err(|e| MigrationError::Directory {
        path: migrations_dir.to_path_buf(),
        message: format!("Failed to create migrations directory: {e}"),
    })?;

    let filepath = migrations_dir.join(&filename);
    if filepath.exists() {
        return Err(MigrationError::Directory {
            path: filepath,
            message: "migration file already exists".to_string(),
        });
    }

    fs::write(&filepath, render_template(&filename, name, now)).map_err(|e| {
        MigrationError::Directory {
            path: filepath.clone(),
            message: format!("Failed to write migration file: {e}"),
        }
    })?;

    Ok(filepath)
}
