//! Shared context handed to every migration unit invocation

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Format used by [`MigrationContext::now`]: ISO-8601, millisecond precision, no zone suffix
pub const NOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of document identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV4;

impl IdGenerator for UuidV4 {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic ids `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

/// Read-only bundle of helpers available to `execute` and `rollback`
///
/// Built once by the driver and passed by reference into every call; units
/// never reach for process-wide state. Cloning is cheap and shares the helpers.
#[derive(Clone)]
pub struct MigrationContext {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl MigrationContext {
    /// Context with the wall clock and random UUIDs
    pub fn new() -> Self {
        Self::with_helpers(Arc::new(SystemClock), Arc::new(UuidV4))
    }

    pub fn with_helpers(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { clock, ids }
    }

    /// A fresh identifier (v4 UUID string by default)
    pub fn uuid(&self) -> String {
        self.ids.next_id()
    }

    /// Current instant
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current instant formatted as `YYYY-MM-DDTHH:MM:SS.mmm`
    pub fn now(&self) -> String {
        format_now(self.timestamp())
    }
}

impl Default for MigrationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MigrationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationContext").finish_non_exhaustive()
    }
}

pub fn format_now(instant: DateTime<Utc>) -> String {
    instant.format(NOW_FORMAT).to_string()
}
