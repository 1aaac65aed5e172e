//! Process configuration for the migration runner.
//!
//! Settings are read with the `config` crate from an optional
//! `config/migrate.toml` file and then from environment variables, which win.
//! Keys are the lower-cased environment variable names (`mongo_host`,
//! `migrations_dir`, ...), so the same names work in both sources.

use config::{Config, Environment, File, Map};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the optional configuration file
pub const CONFIG_FILE: &str = "config/migrate.toml";

/// Configuration errors, raised before any I/O against the cluster
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value is absent or empty
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    /// A value is present but cannot be interpreted
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    /// The configuration sources could not be read
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),
}

/// Raw, stringly-typed view of the sources before validation
#[derive(Debug, Deserialize, Default)]
struct RawSettings {
    mongo_host: Option<String>,
    mongo_port: Option<String>,
    mongo_username: Option<String>,
    mongo_password: Option<String>,
    migrations_dir: Option<String>,
    migrations_db: Option<String>,
    migrations_extensions: Option<String>,
    migrations_connect_timeout_secs: Option<String>,
    migrations_initial_backoff_ms: Option<String>,
    migrations_max_backoff_ms: Option<String>,
}

/// Validated runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Root of the migrations tree
    pub migrations_dir: PathBuf,
    /// Ledger database name, also the ledger collection name inside each tenant database
    pub ledger_db: String,
    /// File extensions (without the dot) the discoverer accepts
    pub extensions: Vec<String>,
    /// Overall deadline for the connection gate
    pub connect_timeout: Duration,
    /// First delay between health probes
    pub initial_backoff: Duration,
    /// Upper bound for the delay between health probes
    pub max_backoff: Duration,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("/migrations")
}

fn default_ledger_db() -> String {
    "_migration".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["rs".to_string()]
}

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;
const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

/// The part of the configuration that locates migration files
///
/// Needs no cluster credentials, so commands that only read the migrations
/// tree resolve it with the same keys and defaults as a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub migrations_dir: PathBuf,
    pub ledger_db: String,
    pub extensions: Vec<String>,
}

impl DiscoveryConfig {
    /// Load from `config/migrate.toml` (optional) and the process environment; `MONGO_*` may be absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::validate(read_sources()?)
    }

    /// Same as [`DiscoveryConfig::load`] over an explicit variable map
    pub fn from_env_map(vars: Map<String, String>) -> Result<Self, ConfigError> {
        Self::validate(read_env_map(vars)?)
    }

    fn validate(raw: RawSettings) -> Result<Self, ConfigError> {
        let migrations_dir = optional(raw.migrations_dir)
            .map(PathBuf::from)
            .unwrap_or_else(default_migrations_dir);
        let ledger_db = optional(raw.migrations_db).unwrap_or_else(default_ledger_db);

        let extensions = match optional(raw.migrations_extensions) {
            Some(list) => parse_extensions(&list)?,
            None => default_extensions(),
        };

        Ok(Self {
            migrations_dir,
            ledger_db,
            extensions,
        })
    }
}

impl From<&MigrateConfig> for DiscoveryConfig {
    fn from(config: &MigrateConfig) -> Self {
        Self {
            migrations_dir: config.migrations_dir.clone(),
            ledger_db: config.ledger_db.clone(),
            extensions: config.extensions.clone(),
        }
    }
}

fn read_sources() -> Result<RawSettings, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::default())
        .build()?;
    Ok(settings.try_deserialize()?)
}

fn read_env_map(vars: Map<String, String>) -> Result<RawSettings, ConfigError> {
    let settings = Config::builder()
        .add_source(Environment::default().source(Some(vars)))
        .build()?;
    Ok(settings.try_deserialize()?)
}

impl MigrateConfig {
    /// Load the configuration from `config/migrate.toml` (optional) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::validate(read_sources()?)
    }

    /// Load the configuration from an explicit variable map instead of the process environment.
    ///
    /// Keys are environment variable names (`MONGO_HOST`, ...).
    pub fn from_env_map(vars: Map<String, String>) -> Result<Self, ConfigError> {
        Self::validate(read_env_map(vars)?)
    }

    fn validate(mut raw: RawSettings) -> Result<Self, ConfigError> {
        let host = required(raw.mongo_host.take(), "MONGO_HOST")?;
        let port = required(raw.mongo_port.take(), "MONGO_PORT")?;
        let username = required(raw.mongo_username.take(), "MONGO_USERNAME")?;
        let password = required(raw.mongo_password.take(), "MONGO_PASSWORD")?;

        let port = port.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
            key: "MONGO_PORT",
            message: format!("'{port}' is not a port number: {e}"),
        })?;

        let connect_timeout = Duration::from_secs(parse_u64_or(
            raw.migrations_connect_timeout_secs.take(),
            "MIGRATIONS_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?);
        let initial_backoff = Duration::from_millis(parse_u64_or(
            raw.migrations_initial_backoff_ms.take(),
            "MIGRATIONS_INITIAL_BACKOFF_MS",
            DEFAULT_INITIAL_BACKOFF_MS,
        )?);
        let max_backoff = Duration::from_millis(parse_u64_or(
            raw.migrations_max_backoff_ms.take(),
            "MIGRATIONS_MAX_BACKOFF_MS",
            DEFAULT_MAX_BACKOFF_MS,
        )?);

        if initial_backoff.is_zero() {
            return Err(ConfigError::Invalid {
                key: "MIGRATIONS_INITIAL_BACKOFF_MS",
                message: "must be at least 1ms".to_string(),
            });
        }

        if max_backoff < initial_backoff {
            return Err(ConfigError::Invalid {
                key: "MIGRATIONS_MAX_BACKOFF_MS",
                message: format!(
                    "maximum backoff ({}ms) is lower than the initial backoff ({}ms)",
                    max_backoff.as_millis(),
                    initial_backoff.as_millis()
                ),
            });
        }

        let DiscoveryConfig {
            migrations_dir,
            ledger_db,
            extensions,
        } = DiscoveryConfig::validate(raw)?;

        Ok(Self {
            host,
            port,
            username,
            password,
            migrations_dir,
            ledger_db,
            extensions,
            connect_timeout,
            initial_backoff,
            max_backoff,
        })
    }
}

/// Empty strings count as absent, matching how the runner has always read its environment.
fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    optional(value).ok_or(ConfigError::Missing(key))
}

fn parse_u64_or(value: Option<String>, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional(value) {
        Some(v) => v.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
            key,
            message: format!("'{v}' is not a non-negative integer: {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_extensions(list: &str) -> Result<Vec<String>, ConfigError> {
    let extensions: Vec<String> = list
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_string())
        .filter(|ext| !ext.is_empty())
        .collect();
    if extensions.is_empty() {
        return Err(ConfigError::Invalid {
            key: "MIGRATIONS_EXTENSIONS",
            message: format!("'{list}' names no extension"),
        });
    }
    Ok(extensions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> Map<String, String> {
        let mut vars = Map::new();
        vars.insert("MONGO_HOST".to_string(), "mongo".to_string());
        vars.insert("MONGO_PORT".to_string(), "27017".to_string());
        vars.insert("MONGO_USERNAME".to_string(), "root".to_string());
        vars.insert("MONGO_PASSWORD".to_string(), "secret".to_string());
        vars
    }

    #[test]
    fn test_defaults_applied() {
        let config = MigrateConfig::from_env_map(base_vars()).expect("config should load");
        assert_eq!(config.host, "mongo");
        assert_eq!(config.port, 27017);
        assert_eq!(config.migrations_dir, PathBuf::from("/migrations"));
        assert_eq!(config.ledger_db, "_migration");
        assert_eq!(config.extensions, vec!["rs".to_string()]);
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
        assert_eq!(config.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.max_backoff, Duration::from_millis(5_000));
    }

    #[test]
    fn test_each_required_variable_is_enforced() {
        for key in ["MONGO_HOST", "MONGO_PORT", "MONGO_USERNAME", "MONGO_PASSWORD"] {
            let mut vars = base_vars();
            vars.remove(key);
            match MigrateConfig::from_env_map(vars) {
                Err(ConfigError::Missing(missing)) => assert_eq!(missing, key),
                other => panic!("Expected Missing({key}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut vars = base_vars();
        vars.insert("MONGO_PASSWORD".to_string(), String::new());
        let err = MigrateConfig::from_env_map(vars).expect_err("empty password must be rejected");
        assert_eq!(err.to_string(), "missing environment variable MONGO_PASSWORD");
    }

    #[test]
    fn test_overrides() {
        let mut vars = base_vars();
        vars.insert("MIGRATIONS_DIR".to_string(), "/srv/migrations".to_string());
        vars.insert("MIGRATIONS_DB".to_string(), "_ledger".to_string());
        vars.insert("MIGRATIONS_EXTENSIONS".to_string(), ".rs, toml".to_string());
        vars.insert("MIGRATIONS_CONNECT_TIMEOUT_SECS".to_string(), "5".to_string());
        let config = MigrateConfig::from_env_map(vars).expect("config should load");
        assert_eq!(config.migrations_dir, PathBuf::from("/srv/migrations"));
        assert_eq!(config.ledger_db, "_ledger");
        assert_eq!(config.extensions, vec!["rs".to_string(), "toml".to_string()]);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut vars = base_vars();
        vars.insert("MONGO_PORT".to_string(), "mongo-port".to_string());
        match MigrateConfig::from_env_map(vars) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "MONGO_PORT"),
            other => panic!("Expected Invalid(MONGO_PORT), got {other:?}"),
        }
    }

    #[test]
    fn test_zero_initial_backoff_rejected() {
        let mut vars = base_vars();
        vars.insert("MIGRATIONS_INITIAL_BACKOFF_MS".to_string(), "0".to_string());
        vars.insert("MIGRATIONS_MAX_BACKOFF_MS".to_string(), "0".to_string());
        assert!(matches!(
            MigrateConfig::from_env_map(vars),
            Err(ConfigError::Invalid { key: "MIGRATIONS_INITIAL_BACKOFF_MS", .. })
        ));
    }

    #[test]
    fn test_discovery_needs_no_credentials() {
        let discovery = DiscoveryConfig::from_env_map(Map::new()).expect("discovery should load");
        assert_eq!(discovery.migrations_dir, PathBuf::from("/migrations"));
        assert_eq!(discovery.ledger_db, "_migration");
        assert_eq!(discovery.extensions, vec!["rs".to_string()]);
    }

    #[test]
    fn test_discovery_matches_full_config() {
        let mut vars = base_vars();
        vars.insert("MIGRATIONS_DIR".to_string(), "/srv/migrations".to_string());
        vars.insert("MIGRATIONS_EXTENSIONS".to_string(), "js".to_string());
        let config = MigrateConfig::from_env_map(vars.clone()).expect("config should load");
        let discovery = DiscoveryConfig::from_env_map(vars).expect("discovery should load");
        assert_eq!(discovery, DiscoveryConfig::from(&config));
    }

    #[test]
    fn test_backoff_bounds_checked() {
        let mut vars = base_vars();
        vars.insert("MIGRATIONS_INITIAL_BACKOFF_MS".to_string(), "1000".to_string());
        vars.insert("MIGRATIONS_MAX_BACKOFF_MS".to_string(), "10".to_string());
        assert!(matches!(
            MigrateConfig::from_env_map(vars),
            Err(ConfigError::Invalid { key: "MIGRATIONS_MAX_BACKOFF_MS", .. })
        ));
    }
}
