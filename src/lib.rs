//! # Shoreline
//!
//! Applies versioned, ledger-tracked migration units to every tenant database
//! of a MongoDB cluster, one unit and one database at a time, stopping at the
//! first failure.
//!
//! See [`migration`] for the unit contract and the engine.

pub mod config;
pub mod connection;
pub mod executor;
pub mod migration;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use executor::{DocumentExecutor, MongoExecutor, StoreError};
pub use mongodb::bson;
