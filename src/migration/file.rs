//! Migration file discovery and parsing

use crate::migration::MigrationError;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Represents a discovered migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Path to the migration file
    pub path: PathBuf,

    /// Unit identity: path relative to the migrations root, `/`-separated
    pub name: String,

    /// Ordering key taken from the leading digits of the file name
    pub order: u64,
}

impl MigrationFile {
    pub fn new(path: PathBuf, name: String, order: u64) -> Self {
        Self { path, name, order }
    }

    /// Parse the ordering key from a file name
    ///
    /// Expected format: `{digits}{anything}.{ext}`, typically `{YYYYMMDDHHMM[SS]}_{name}.rs`
    ///
    /// # Example
    /// - `202212181928_add_position.rs` → 202212181928
    pub fn parse_order(filename: &str) -> Result<u64, MigrationError> {
        // Pattern: {digits}...
        let re = Regex::new(r"^(\d+)")
            .map_err(|e| MigrationError::InvalidFormat(format!("Invalid regex: {e}")))?;

        let digits = re
            .captures(filename)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| {
                MigrationError::InvalidFormat(format!(
                    "Migration file name '{filename}' does not start with an ordering prefix: {{YYYYMMDDHHMMSS}}_{{name}}"
                ))
            })?
            .as_str();

        digits.parse::<u64>().map_err(|e| {
            MigrationError::InvalidFormat(format!(
                "Ordering prefix '{digits}' of '{filename}' is not a valid number: {e}"
            ))
        })
    }
}

/// Unit identity of `path` under `root`
pub fn identity_of(root: &Path, path: &Path) -> Result<String, MigrationError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        MigrationError::InvalidFormat(format!(
            "{} is not under {}",
            path.display(),
            root.display()
        ))
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(|| {
                MigrationError::InvalidFormat(format!("Non UTF-8 path: {}", path.display()))
            })?),
            _ => {
                return Err(MigrationError::InvalidFormat(format!(
                    "Unexpected path component in {}",
                    path.display()
                )))
            }
        }
    }
    Ok(parts.join("/"))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
}

/// Discover all migration files under a directory tree
///
/// Walks `migrations_dir` recursively, keeps files whose extension is in
/// `extensions`, and returns them sorted by ordering key, then by identity.
/// The order depends only on file names, never on file metadata.
///
/// # Errors
///
/// Returns errors if:
/// - The directory doesn't exist or can't be read
/// - A matching file has no ordering prefix
pub fn discover_migrations(
    migrations_dir: &Path,
    extensions: &[String],
) -> Result<Vec<MigrationFile>, MigrationError> {
    if !migrations_dir.is_dir() {
        return Err(MigrationError::Directory {
            path: migrations_dir.to_path_buf(),
            message: "not an existing directory".to_string(),
        });
    }

    let mut migrations = Vec::new();

    for entry in WalkDir::new(migrations_dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| MigrationError::Directory {
            path: e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| migrations_dir.to_path_buf()),
            message: e.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !has_extension(path, extensions) {
            log::debug!("filter file {}", path.display());
            continue;
        }

        let filename = entry.file_name().to_str().ok_or_else(|| {
            MigrationError::InvalidFormat(format!("Invalid filename: {}", path.display()))
        })?;
        let order = MigrationFile::parse_order(filename)?;
        let name = identity_of(migrations_dir, path)?;

        migrations.push(MigrationFile::new(path.to_path_buf(), name, order));
    }

    migrations.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));

    Ok(migrations)
}
