//! Connection Module
//!
//! Provides connection establishment for the `mongodb` driver and the connection
//! gate that holds the runner back until the cluster answers a health probe.
//!
//! This module provides:
//! - Client option building and validation from [`MigrateConfig`]
//! - Connection establishment ([`connect`])
//! - Readiness polling with bounded exponential backoff ([`wait_until_ready`])

use crate::config::MigrateConfig;
use crate::executor::{DocumentExecutor, MongoExecutor};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use std::time::{Duration, Instant};

/// How long a single health probe may wait for a server before it counts as failed
const PROBE_SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection error type
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Host/port/credentials cannot form valid client options
    #[error("Invalid connection options: {0}")]
    InvalidOptions(String),
    /// Client construction failed in the driver
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    /// The cluster never answered a health probe within the deadline
    #[error("cluster unreachable after {attempts} attempt(s) over {elapsed:?}: {last_error}")]
    Unreachable {
        attempts: u32,
        elapsed: Duration,
        last_error: String,
    },
}

/// Shortest delay between two health probes
pub const MIN_BACKOFF: Duration = Duration::from_millis(1);

/// Bounded exponential backoff for the connection gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failed probe
    pub initial_backoff: Duration,
    /// Upper bound on the delay between probes
    pub max_backoff: Duration,
    /// Overall deadline, measured from the first probe
    pub deadline: Duration,
}

impl RetryPolicy {
    /// Build the policy from the runner configuration
    pub fn from_config(config: &MigrateConfig) -> Self {
        Self {
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            deadline: config.connect_timeout,
        }
    }

    /// Delay to wait after `failed_attempts` consecutive failures (1-based), never below 1ms
    pub fn backoff_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
            .max(MIN_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            deadline: Duration::from_secs(60),
        }
    }
}

/// Validates that the configured host and port form a server address
///
/// # Returns
///
/// Returns the parsed `ServerAddress`, or `ConnectionError::InvalidOptions`.
pub fn server_address(host: &str, port: u16) -> Result<ServerAddress, ConnectionError> {
    if host.trim().is_empty() {
        return Err(ConnectionError::InvalidOptions(
            "Host cannot be empty".to_string(),
        ));
    }
    if host.contains('/') || host.contains('@') {
        return Err(ConnectionError::InvalidOptions(format!(
            "Host '{host}' must be a bare host name, not a connection string"
        )));
    }
    if port == 0 {
        return Err(ConnectionError::InvalidOptions(
            "Port must be non-zero".to_string(),
        ));
    }
    ServerAddress::parse(format!("{host}:{port}"))
        .map_err(|e| ConnectionError::InvalidOptions(format!("{host}:{port}: {e}")))
}

/// Builds driver options from the runner configuration
///
/// Credentials are passed structurally, so passwords need no URI escaping.
pub fn client_options(config: &MigrateConfig) -> Result<ClientOptions, ConnectionError> {
    let address = server_address(&config.host, config.port)?;
    let credential = Credential::builder()
        .username(config.username.clone())
        .password(config.password.clone())
        .build();

    let options = ClientOptions::builder()
        .hosts(vec![address])
        .credential(credential)
        .server_selection_timeout(PROBE_SERVER_SELECTION_TIMEOUT)
        .app_name("shoreline".to_string())
        .build();

    Ok(options)
}

/// Establishes a client for the configured cluster
///
/// # Notes
///
/// The driver connects lazily: this returns as soon as the client is built.
/// Use [`wait_until_ready`] to block until the cluster actually answers.
pub fn connect(config: &MigrateConfig) -> Result<MongoExecutor, ConnectionError> {
    let options = client_options(config)?;
    let client = mongodb::sync::Client::with_options(options)?;
    log::debug!("client created for {}:{}", config.host, config.port);
    Ok(MongoExecutor::new(client))
}

/// Block until the cluster answers a health probe
///
/// Probes immediately, then waits with exponential backoff between attempts.
/// The deadline is checked before every attempt and before every sleep, and a
/// sleep never extends past it.
///
/// # Returns
///
/// Returns the number of probes issued, or `ConnectionError::Unreachable`
/// carrying the last probe error once the deadline is exhausted.
pub fn wait_until_ready(
    executor: &dyn DocumentExecutor,
    policy: &RetryPolicy,
) -> Result<u32, ConnectionError> {
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        log::info!("ping database...");
        let last_error = match executor.ping() {
            Ok(()) => {
                log::info!("Connected!");
                return Ok(attempts);
            }
            Err(e) => e.to_string(),
        };

        let elapsed = start.elapsed();
        let remaining = policy.deadline.saturating_sub(elapsed);
        if remaining.is_zero() {
            return Err(ConnectionError::Unreachable {
                attempts,
                elapsed,
                last_error,
            });
        }

        let delay = policy.backoff_for(attempts).min(remaining);
        log::debug!("ping attempt {attempts} failed ({last_error}), retrying in {delay:?}");
        std::thread::sleep(delay);
    }
}
