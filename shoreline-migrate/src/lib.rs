//! Shoreline Migration Library
//!
//! Registry of the migration units shipped with the runner, plus the helpers
//! behind the CLI's `generate` command. The CLI tool (main.rs) uses this library.
//!
//! Unit sources live under the repository's `migrations/` tree, which is also
//! the directory the runner scans at run time; each file is compiled in here.

pub mod generate;

use shoreline::migration::{MigrationError, MigrationRegistry};

#[path = "../../migrations/examples/202201010000_hello.rs"]
pub mod hello;

#[path = "../../migrations/2022/202212181928_add_position.rs"]
pub mod add_position;

/// Registry holding every unit compiled into this binary
pub fn builtin_registry() -> Result<MigrationRegistry, MigrationError> {
    MigrationRegistry::new()
        .with(Box::new(hello::Hello))?
        .with(Box::new(add_position::AddDefaultPositions))
}
