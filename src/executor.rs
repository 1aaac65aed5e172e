//! `DocumentExecutor` Module
//!
//! Provides the `DocumentExecutor` trait that abstracts every cluster operation the
//! migration runner performs: the health probe, database enumeration, ledger
//! bookkeeping and the document operations exposed to migration units.
//!
//! The production implementation is [`MongoExecutor`], which drives the blocking
//! (`sync`) API of the `mongodb` driver. Tests use the in-memory cluster from
//! [`crate::testing`].

use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use std::time::Instant;

/// Store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Error reported by the `mongodb` driver
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    /// A document could not be converted to or from its typed form
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Other execution errors (also used by migration units for their own failures)
    #[error("Execution error: {0}")]
    Other(String),
}

/// Trait for executing operations against a document-store cluster
///
/// Every method is blocking and names its target database explicitly, so one
/// executor serves all tenant databases of the cluster. The runner is a single
/// sequential consumer, so implementations need no pooling.
pub trait DocumentExecutor {
    /// Issue a health probe against the cluster
    fn ping(&self) -> Result<(), StoreError>;

    /// List the names of every database known to the cluster
    fn list_database_names(&self) -> Result<Vec<String>, StoreError>;

    /// Find the first document in `database.collection` matching `filter`
    fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Find every document in `database.collection` matching `filter`
    fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> Result<Vec<Document>, StoreError>;

    /// Insert a single document
    fn insert_one(&self, database: &str, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Insert several documents, returning how many were inserted
    fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError>;

    /// Apply `update` to every document matching `filter`, returning the modified count
    fn update_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, StoreError>;

    /// Delete the first document matching `filter`, returning the deleted count
    fn delete_one(&self, database: &str, collection: &str, filter: Document) -> Result<u64, StoreError>;

    /// Delete every document matching `filter`, returning the deleted count
    fn delete_many(&self, database: &str, collection: &str, filter: Document) -> Result<u64, StoreError>;

    /// Drop a collection (no-op if it does not exist)
    fn drop_collection(&self, database: &str, collection: &str) -> Result<(), StoreError>;

    /// Create an index on `keys`, returning the index name
    fn create_index(
        &self,
        database: &str,
        collection: &str,
        keys: Document,
        unique: bool,
    ) -> Result<String, StoreError>;
}

/// `DocumentExecutor` backed by the blocking `mongodb` client
pub struct MongoExecutor {
    client: mongodb::sync::Client,
}

impl MongoExecutor {
    /// Wrap an already-configured client
    pub fn new(client: mongodb::sync::Client) -> Self {
        Self { client }
    }

    /// Access the underlying client
    pub fn client(&self) -> &mongodb::sync::Client {
        &self.client
    }

    fn collection(&self, database: &str, collection: &str) -> mongodb::sync::Collection<Document> {
        self.client.database(database).collection::<Document>(collection)
    }
}

impl DocumentExecutor for MongoExecutor {
    fn ping(&self) -> Result<(), StoreError> {
        let start = Instant::now();
        self.client.database("admin").run_command(doc! { "ping": 1 }).run()?;
        log::trace!("ping answered in {:?}", start.elapsed());
        Ok(())
    }

    fn list_database_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.client.list_database_names().run()?)
    }

    fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.collection(database, collection).find_one(filter).run()?)
    }

    fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> Result<Vec<Document>, StoreError> {
        let cursor = self.collection(database, collection).find(filter).run()?;
        let mut documents = Vec::new();
        for document in cursor {
            documents.push(document?);
        }
        Ok(documents)
    }

    fn insert_one(&self, database: &str, collection: &str, document: Document) -> Result<(), StoreError> {
        self.collection(database, collection).insert_one(document).run()?;
        Ok(())
    }

    fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        if documents.is_empty() {
            return Ok(0);
        }
        let result = self.collection(database, collection).insert_many(documents).run()?;
        Ok(result.inserted_ids.len())
    }

    fn update_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, StoreError> {
        let result = self
            .collection(database, collection)
            .update_many(filter, update)
            .run()?;
        Ok(result.modified_count)
    }

    fn delete_one(&self, database: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let result = self.collection(database, collection).delete_one(filter).run()?;
        Ok(result.deleted_count)
    }

    fn delete_many(&self, database: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let result = self.collection(database, collection).delete_many(filter).run()?;
        Ok(result.deleted_count)
    }

    fn drop_collection(&self, database: &str, collection: &str) -> Result<(), StoreError> {
        self.collection(database, collection).drop().run()?;
        Ok(())
    }

    fn create_index(
        &self,
        database: &str,
        collection: &str,
        keys: Document,
        unique: bool,
    ) -> Result<String, StoreError> {
        let options = IndexOptions::builder().unique(unique).build();
        let model = IndexModel::builder().keys(keys).options(options).build();
        let result = self.collection(database, collection).create_index(model).run()?;
        Ok(result.index_name)
    }
}
