//! In-process migration execution helpers

use crate::config::{ConfigError, MigrateConfig};
use crate::connection::{connect, wait_until_ready, ConnectionError, RetryPolicy};
use crate::executor::DocumentExecutor;
use crate::migration::{MigrationContext, MigrationError, MigrationRegistry, Migrator, RunSummary};

/// Any failure of a full run, by phase
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl RunError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Run migrations against the configured cluster
///
/// This is the whole pipeline the container entrypoint runs:
/// - Client construction from the configuration
/// - Connection gate (bounded backoff, fails with `ConnectionError::Unreachable`)
/// - Discovery, binding and execution via [`Migrator::up`]
///
/// # Arguments
///
/// * `config` - Validated configuration (required variables were checked when it was loaded)
/// * `registry` - Every unit compiled into the binary
/// * `context` - Shared context handed to every unit invocation
///
/// # Example
///
/// ```rust,no_run
/// use shoreline::config::MigrateConfig;
/// use shoreline::migration::{run_migrations, MigrationContext, MigrationRegistry};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = MigrateConfig::load()?;
///     let registry = MigrationRegistry::new();
///     let summary = run_migrations(&config, &registry, &MigrationContext::new())?;
///     println!("applied {}", summary.applied);
///     Ok(())
/// }
/// ```
pub fn run_migrations(
    config: &MigrateConfig,
    registry: &MigrationRegistry,
    context: &MigrationContext,
) -> Result<RunSummary, RunError> {
    let executor = connect(config)?;
    run_migrations_with(&executor, config, registry, context)
}

/// Same as [`run_migrations`] over an existing executor
pub fn run_migrations_with(
    executor: &dyn DocumentExecutor,
    config: &MigrateConfig,
    registry: &MigrationRegistry,
    context: &MigrationContext,
) -> Result<RunSummary, RunError> {
    let attempts = wait_until_ready(executor, &RetryPolicy::from_config(config))?;
    log::debug!("cluster ready after {attempts} probe(s)");

    let migrator = Migrator::from_config(config);
    let summary = migrator.up(executor, registry, context)?;

    if summary.applied > 0 {
        log::info!("Applied {} migration(s)", summary.applied);
    } else {
        log::debug!("No pending migrations to apply");
    }

    Ok(summary)
}
