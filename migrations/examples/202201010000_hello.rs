//! Migration: hello
//! Version: 202201010000
//! Minimal example unit.

use shoreline::bson::doc;
use shoreline::migration::{DocumentManager, Migration, MigrationContext};
use shoreline::StoreError;

pub struct Hello;

impl Migration for Hello {
    fn name(&self) -> &str {
        "examples/202201010000_hello.rs"
    }

    fn execute(&self, db: &DocumentManager<'_>, _context: &MigrationContext) -> Result<(), StoreError> {
        db.insert_one("myCollection", doc! { "name": "kikoo", "age": 33 })
    }

    fn rollback(&self, db: &DocumentManager<'_>, _context: &MigrationContext) -> Result<(), StoreError> {
        log::info!("hello world rolled back in {}", db.database_name());
        Ok(())
    }
}
