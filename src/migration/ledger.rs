//! Migration ledger management
//!
//! Each target database carries its own ledger collection, named after the
//! configured ledger name (`_migration` by default). A record's presence means
//! the unit was applied to that database; the engine only ever inserts.

use crate::executor::{DocumentExecutor, StoreError};
use crate::migration::MigrationRecord;
use mongodb::bson::doc;

/// Per-database view of the ledger collections
#[derive(Debug, Clone, Copy)]
pub struct Ledger<'a> {
    collection: &'a str,
}

impl<'a> Ledger<'a> {
    /// `collection` is the configured ledger name
    pub fn new(collection: &'a str) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &str {
        self.collection
    }

    /// Look up the record of `name` in `database`
    pub fn find(
        &self,
        executor: &dyn DocumentExecutor,
        database: &str,
        name: &str,
    ) -> Result<Option<MigrationRecord>, StoreError> {
        executor
            .find_one(database, self.collection, MigrationRecord::filter_for(name))?
            .map(|document| MigrationRecord::from_document(&document))
            .transpose()
    }

    pub fn is_applied(
        &self,
        executor: &dyn DocumentExecutor,
        database: &str,
        name: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.find(executor, database, name)?.is_some())
    }

    /// Insert a record; callers guarantee no record for the same name exists yet
    pub fn record(
        &self,
        executor: &dyn DocumentExecutor,
        database: &str,
        record: &MigrationRecord,
    ) -> Result<(), StoreError> {
        executor.insert_one(database, self.collection, record.to_document())
    }

    /// All records of `database`, oldest first
    pub fn applied(
        &self,
        executor: &dyn DocumentExecutor,
        database: &str,
    ) -> Result<Vec<MigrationRecord>, StoreError> {
        let mut records = executor
            .find(database, self.collection, doc! {})?
            .iter()
            .map(MigrationRecord::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| a.executed_at.cmp(&b.executed_at).then_with(|| a.name.cmp(&b.name)));
        Ok(records)
    }
}
