//! In-memory cluster for tests.
//!
//! [`MemoryExecutor`] implements [`DocumentExecutor`] over nested maps and records
//! every write, so tests can assert exactly which operations a run performed.
//! Faults can be injected for pings and for writes into a given collection.

use crate::executor::{DocumentExecutor, StoreError};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

type Collections = BTreeMap<String, Vec<Document>>;

#[derive(Default)]
struct State {
    databases: BTreeMap<String, Collections>,
    pings: u32,
    failing_pings: u32,
    failing_writes: BTreeSet<(String, String)>,
    writes: Vec<String>,
}

/// In-memory `DocumentExecutor`
#[derive(Default)]
pub struct MemoryExecutor {
    state: Mutex<State>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cluster that already holds the given (empty) databases
    pub fn with_databases<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let executor = Self::new();
        for name in names {
            executor.add_database(name);
        }
        executor
    }

    pub fn add_database(&self, name: impl Into<String>) {
        self.lock().databases.entry(name.into()).or_default();
    }

    /// Make the next `count` pings fail with a connection error
    pub fn fail_next_pings(&self, count: u32) {
        self.lock().failing_pings = count;
    }

    /// Number of pings received so far
    pub fn ping_count(&self) -> u32 {
        self.lock().pings
    }

    /// Make every write into `database.collection` fail
    pub fn fail_writes_to(&self, database: &str, collection: &str) {
        self.lock()
            .failing_writes
            .insert((database.to_string(), collection.to_string()));
    }

    /// Snapshot of a collection's documents, in insertion order
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.lock()
            .databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    /// Every write performed, as `"<op> <database>.<collection>"`
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// Writes performed against one database
    pub fn writes_to(&self, database: &str) -> Vec<String> {
        let prefix = format!(" {database}.");
        self.lock()
            .writes
            .iter()
            .filter(|w| w.contains(&prefix))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test must not poison the cluster for assertions that follow.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write<T>(
        &self,
        op: &str,
        database: &str,
        collection: &str,
        apply: impl FnOnce(&mut Vec<Document>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.lock();
        if state
            .failing_writes
            .contains(&(database.to_string(), collection.to_string()))
        {
            return Err(StoreError::Other(format!(
                "write to {database}.{collection} rejected"
            )));
        }
        state.writes.push(format!("{op} {database}.{collection}"));
        let documents = state
            .databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
        apply(documents)
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

fn with_id(mut document: Document) -> Document {
    if !document.contains_key("_id") {
        document.insert("_id", ObjectId::new());
    }
    document
}

fn apply_update(document: &mut Document, update: &Document) -> Result<bool, StoreError> {
    let before = document.clone();
    for (operator, fields) in update {
        let fields = match fields {
            Bson::Document(fields) => fields,
            other => {
                return Err(StoreError::Other(format!(
                    "update operator {operator} expects a document, got {other}"
                )))
            }
        };
        match operator.as_str() {
            "$set" => {
                for (key, value) in fields {
                    document.insert(key.clone(), value.clone());
                }
            }
            "$unset" => {
                for key in fields.keys() {
                    document.remove(key);
                }
            }
            other => {
                return Err(StoreError::Other(format!(
                    "unsupported update operator {other}"
                )))
            }
        }
    }
    Ok(*document != before)
}

impl DocumentExecutor for MemoryExecutor {
    fn ping(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.pings += 1;
        if state.failing_pings > 0 {
            state.failing_pings -= 1;
            return Err(StoreError::Other("connection refused".to_string()));
        }
        Ok(())
    }

    fn list_database_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().databases.keys().cloned().collect())
    }

    fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .documents(database, collection)
            .into_iter()
            .find(|d| matches(d, &filter)))
    }

    fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .documents(database, collection)
            .into_iter()
            .filter(|d| matches(d, &filter))
            .collect())
    }

    fn insert_one(&self, database: &str, collection: &str, document: Document) -> Result<(), StoreError> {
        self.write("insert_one", database, collection, |docs| {
            docs.push(with_id(document));
            Ok(())
        })
    }

    fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        self.write("insert_many", database, collection, |docs| {
            let count = documents.len();
            docs.extend(documents.into_iter().map(with_id));
            Ok(count)
        })
    }

    fn update_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, StoreError> {
        self.write("update_many", database, collection, |docs| {
            let mut modified = 0;
            for document in docs.iter_mut().filter(|d| matches(d, &filter)) {
                if apply_update(document, &update)? {
                    modified += 1;
                }
            }
            Ok(modified)
        })
    }

    fn delete_one(&self, database: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.write("delete_one", database, collection, |docs| {
            match docs.iter().position(|d| matches(d, &filter)) {
                Some(index) => {
                    docs.remove(index);
                    Ok(1)
                }
                None => Ok(0),
            }
        })
    }

    fn delete_many(&self, database: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.write("delete_many", database, collection, |docs| {
            let before = docs.len();
            docs.retain(|d| !matches(d, &filter));
            Ok((before - docs.len()) as u64)
        })
    }

    fn drop_collection(&self, database: &str, collection: &str) -> Result<(), StoreError> {
        self.write("drop_collection", database, collection, |docs| {
            docs.clear();
            Ok(())
        })
    }

    fn create_index(
        &self,
        database: &str,
        collection: &str,
        keys: Document,
        _unique: bool,
    ) -> Result<String, StoreError> {
        self.write("create_index", database, collection, |_| {
            let name = keys
                .iter()
                .map(|(key, direction)| format!("{key}_{direction}"))
                .collect::<Vec<_>>()
                .join("_");
            Ok(name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_filter_and_update() {
        let cluster = MemoryExecutor::with_databases(["orgdb"]);
        cluster
            .insert_many(
                "orgdb",
                "position",
                vec![doc! { "name": "CEO", "level": "EXECUTIVE" }, doc! { "name": "Bookkeeper", "level": "OPERATIONAL" }],
            )
            .expect("insert");

        let found = cluster
            .find("orgdb", "position", doc! { "level": "EXECUTIVE" })
            .expect("find");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains_key("_id"));

        let modified = cluster
            .update_many("orgdb", "position", doc! {}, doc! { "$set": { "active": true } })
            .expect("update");
        assert_eq!(modified, 2);

        let removed = cluster
            .delete_one("orgdb", "position", doc! { "name": "CEO" })
            .expect("delete");
        assert_eq!(removed, 1);
        assert_eq!(cluster.documents("orgdb", "position").len(), 1);
        assert_eq!(cluster.writes_to("orgdb").len(), 3);
    }

    #[test]
    fn test_injected_write_failure_records_nothing() {
        let cluster = MemoryExecutor::with_databases(["orgdb"]);
        cluster.fail_writes_to("orgdb", "position");
        assert!(cluster.insert_one("orgdb", "position", doc! { "name": "x" }).is_err());
        assert!(cluster.writes().is_empty());
        assert!(cluster.documents("orgdb", "position").is_empty());
    }
}
