//! DocumentManager - the database handle passed to migration units

use crate::executor::{DocumentExecutor, StoreError};
use mongodb::bson::Document;

/// DocumentManager scopes a `DocumentExecutor` to one tenant database
///
/// Units receive it in `execute` and `rollback`; every call lands in the
/// database the engine is currently processing.
pub struct DocumentManager<'a> {
    executor: &'a dyn DocumentExecutor,
    database: &'a str,
}

impl<'a> DocumentManager<'a> {
    pub fn new(executor: &'a dyn DocumentExecutor, database: &'a str) -> Self {
        Self { executor, database }
    }

    /// Name of the database this handle is bound to
    pub fn database_name(&self) -> &str {
        self.database
    }

    pub fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, StoreError> {
        self.executor.find_one(self.database, collection, filter)
    }

    pub fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, StoreError> {
        self.executor.find(self.database, collection, filter)
    }

    pub fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.executor.insert_one(self.database, collection, document)
    }

    pub fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize, StoreError> {
        self.executor.insert_many(self.database, collection, documents)
    }

    pub fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, StoreError> {
        self.executor.update_many(self.database, collection, filter, update)
    }

    pub fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.executor.delete_one(self.database, collection, filter)
    }

    pub fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.executor.delete_many(self.database, collection, filter)
    }

    pub fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.executor.drop_collection(self.database, collection)
    }

    pub fn create_index(&self, collection: &str, keys: Document, unique: bool) -> Result<String, StoreError> {
        self.executor.create_index(self.database, collection, keys, unique)
    }
}
