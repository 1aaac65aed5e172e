//! Migration registry binding discovered files to compiled units

use crate::migration::{Migration, MigrationError, MigrationFile};
use std::collections::BTreeMap;

/// Registry of every migration unit compiled into the binary
///
/// Units are indexed by identity (`Migration::name`). The migrations directory
/// remains the manifest: a unit only runs when discovery finds its file.
#[derive(Default)]
pub struct MigrationRegistry {
    units: BTreeMap<String, Box<dyn Migration>>,
}

/// A discovered file together with the unit registered for it
pub struct BoundMigration<'a> {
    pub file: MigrationFile,
    pub unit: &'a dyn Migration,
}

impl BoundMigration<'_> {
    pub fn name(&self) -> &str {
        &self.file.name
    }
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if a unit with the same name
    /// is already registered.
    pub fn register(&mut self, migration: Box<dyn Migration>) -> Result<(), MigrationError> {
        let name = migration.name().to_string();
        if self.units.contains_key(&name) {
            return Err(MigrationError::AlreadyRegistered { name });
        }
        self.units.insert(name, migration);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, migration: Box<dyn Migration>) -> Result<Self, MigrationError> {
        self.register(migration)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Migration> {
        self.units.get(name).map(|unit| unit.as_ref())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.units.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Bind every discovered file to its unit, keeping discovery order
    ///
    /// Binding happens before anything runs, so a stray file aborts the run
    /// without touching any database.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Unregistered` for the first file with no unit.
    pub fn bind(&self, files: Vec<MigrationFile>) -> Result<Vec<BoundMigration<'_>>, MigrationError> {
        files
            .into_iter()
            .map(|file| match self.get(&file.name) {
                Some(unit) => Ok(BoundMigration { file, unit }),
                None => Err(MigrationError::Unregistered { name: file.name }),
            })
            .collect()
    }
}
